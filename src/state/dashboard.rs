// Dashboard context.
// Owns the client, cache, selection, and filters; loads sections and discards stale results.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::cache::{ResponseCache, TtlPolicy, store};
use crate::error::{DashError, Result};
use crate::github::{AuthMode, GitHubClient, PullRequest, RateLimitInfo};
use crate::registry::{Registry, Repository};
use crate::section::{Section, SectionData, SectionRecords};

use super::actions::select_configured_runs;
use super::filters::{FilterState, SortOrder, extract_users};
use super::view::{EmptyState, SectionView, ViewError};

/// Currently selected repository and section, and the generation of that choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub repository_id: Option<String>,
    /// Section of the most recent load request.
    pub section: Option<Section>,
    /// Bumped on every repository selection and every section load; a load
    /// only publishes or caches results for its own generation.
    pub generation: u64,
}

/// Result of a section fetch before filters are applied.
#[derive(Debug)]
pub struct Fetched {
    pub data: SectionData,
    /// Error that cut pagination short, if the records are partial.
    pub warning: Option<DashError>,
    pub from_cache: bool,
}

#[derive(Debug, Default)]
struct Filters {
    pull_requests: FilterState,
    issues: FilterState,
}

impl Filters {
    fn for_section(&mut self, section: Section) -> Option<&mut FilterState> {
        match section {
            Section::PullRequests => Some(&mut self.pull_requests),
            Section::Issues => Some(&mut self.issues),
            Section::Actions => None,
        }
    }
}

/// Explicit context for fetching, caching, and filtering dashboard data.
///
/// All methods take `&self`, so the dashboard can be shared behind an `Arc`
/// and sections loaded from spawned tasks.
pub struct Dashboard {
    client: GitHubClient,
    registry: Registry,
    ttl: TtlPolicy,
    cache: Mutex<ResponseCache>,
    cache_path: Option<PathBuf>,
    selection: watch::Sender<Selection>,
    filters: Mutex<Filters>,
    view: watch::Sender<SectionView>,
}

impl Dashboard {
    pub fn new(client: GitHubClient, registry: Registry, ttl: TtlPolicy) -> Self {
        let (selection, _) = watch::channel(Selection::default());
        let (view, _) = watch::channel(SectionView::idle(Section::PullRequests));

        Self {
            client,
            registry,
            ttl,
            cache: Mutex::new(ResponseCache::new()),
            cache_path: None,
            selection,
            filters: Mutex::new(Filters::default()),
            view,
        }
    }

    /// Back the cache with a snapshot file, loading it now and saving on change.
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = ResponseCache::load(&path);
        debug!(path = %path.display(), entries = cache.len(), "Loaded cache snapshot");
        self.cache = Mutex::new(cache);
        self.cache_path = Some(path);
        self
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.client.auth_mode()
    }

    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        self.client.rate_limit()
    }

    pub fn selection(&self) -> Selection {
        self.selection.borrow().clone()
    }

    /// Receive every published section view.
    pub fn subscribe(&self) -> watch::Receiver<SectionView> {
        self.view.subscribe()
    }

    /// Select a repository by id or `owner/name`, or clear the selection.
    ///
    /// Bumps the generation, which cancels in-flight loads, and resets the
    /// issue and pull request filters.
    pub async fn select_repository(&self, key: Option<&str>) -> Result<()> {
        let repository_id = match key {
            Some(key) => Some(self.registry.find(key)?.id.clone()),
            None => None,
        };

        self.selection.send_modify(|selection| {
            selection.repository_id = repository_id.clone();
            selection.generation += 1;
        });

        let mut filters = self.filters.lock().await;
        filters.pull_requests.reset();
        filters.issues.reset();

        info!(
            repository = repository_id.as_deref().unwrap_or("<none>"),
            generation = self.selection.borrow().generation,
            "Repository selected"
        );
        Ok(())
    }

    /// Drop every cached response regardless of age, and the snapshot with them.
    pub async fn refresh(&self) {
        self.cache.lock().await.clear();
        if let Some(path) = &self.cache_path {
            if let Err(e) = store::delete(path) {
                warn!(path = %path.display(), error = %e, "Failed to delete cache snapshot");
            }
        }
        info!("Cache cleared");
    }

    /// Current filter state of a section; actions have none.
    pub async fn filter_state(&self, section: Section) -> Option<FilterState> {
        self.filters.lock().await.for_section(section).cloned()
    }

    pub async fn set_sort_order(&self, section: Section, sort_by: SortOrder) {
        if let Some(state) = self.filters.lock().await.for_section(section) {
            state.sort_by = sort_by;
        }
    }

    pub async fn set_user_filter(&self, section: Section, user_filter: &str) {
        if let Some(state) = self.filters.lock().await.for_section(section) {
            state.user_filter = user_filter.trim().to_string();
        }
    }

    /// Reset sort and user filter, keeping the known authors.
    pub async fn clear_filters(&self, section: Section) {
        if let Some(state) = self.filters.lock().await.for_section(section) {
            state.sort_by = SortOrder::default();
            state.user_filter.clear();
        }
    }

    /// Load `section` for the selected repository and publish the view.
    ///
    /// Every call starts a new generation, superseding loads of any section
    /// still in flight. Returns `None` when a newer repository selection or
    /// section load arrived before this one finished; the stale result is
    /// neither cached nor published.
    pub async fn load_section(&self, section: Section) -> Option<SectionView> {
        let mut generation = 0;
        self.selection.send_modify(|selection| {
            selection.section = Some(section);
            selection.generation += 1;
            generation = selection.generation;
        });

        let mut selection_rx = self.selection.subscribe();
        let selection = selection_rx.borrow_and_update().clone();
        if selection.generation != generation {
            debug!(%section, "Superseded before starting");
            return None;
        }

        let Some(repository_id) = selection.repository_id else {
            let view = SectionView::idle(section);
            self.view.send_replace(view.clone());
            return Some(view);
        };

        let repository = match self.registry.find(&repository_id) {
            Ok(repository) => repository,
            Err(e) => {
                let view = SectionView::failed(section, &repository_id, &e);
                self.view.send_replace(view.clone());
                return Some(view);
            }
        };

        self.view
            .send_replace(SectionView::loading(section, &repository.id));

        let fetched = tokio::select! {
            result = self.fetch_section(section, repository, selection.generation) => result,
            _ = selection_rx.changed() => Err(DashError::Cancelled),
        };

        let view = match fetched {
            Ok(fetched) => self.present(fetched).await,
            Err(DashError::Cancelled) => {
                debug!(%section, repository = %repository.id, "Discarding superseded load");
                return None;
            }
            Err(e) => {
                warn!(%section, repository = %repository.id, error = %e, "Section load failed");
                SectionView::failed(section, &repository.id, &e)
            }
        };

        if self.selection.borrow().generation != selection.generation {
            debug!(%section, repository = %repository.id, "Selection changed while presenting");
            return None;
        }

        self.view.send_replace(view.clone());
        Some(view)
    }

    /// Records for one section of one repository, from cache when fresh.
    ///
    /// Results are committed to the cache only if `generation` is still current.
    pub async fn fetch_section(
        &self,
        section: Section,
        repository: &Repository,
        generation: u64,
    ) -> Result<Fetched> {
        if section == Section::Actions && !repository.has_workflows() {
            debug!(repository = %repository.id, "No workflows configured, skipping actions API");
            return Ok(Fetched {
                data: SectionData {
                    repository: repository.clone(),
                    records: SectionRecords::empty(section),
                },
                warning: None,
                from_cache: false,
            });
        }

        let ttl = self.ttl.ttl_for(self.client.auth_mode());
        if let Some(data) = self.cache.lock().await.get(section, &repository.id, ttl) {
            return Ok(Fetched {
                data: data.clone(),
                warning: None,
                from_cache: true,
            });
        }

        let (records, warning) = self.fetch_records(section, repository).await?;
        let data = SectionData {
            repository: repository.clone(),
            records,
        };

        let mut cache = self.cache.lock().await;
        if self.selection.borrow().generation != generation {
            return Err(DashError::Cancelled);
        }
        cache.insert(data.clone());
        self.persist(&cache);

        info!(
            %section,
            repository = %repository.id,
            records = data.records.len(),
            partial = warning.is_some(),
            "Fetched section"
        );

        Ok(Fetched {
            data,
            warning,
            from_cache: false,
        })
    }

    /// Pull requests merged within the last `days` days. Not cached.
    pub async fn merged_pull_requests(&self, key: &str, days: i64) -> Result<Vec<PullRequest>> {
        let repository = self.registry.find(key)?;
        let since = Utc::now() - Duration::days(days);

        let paged = self
            .client
            .merged_pull_requests_since(&repository.owner, &repository.name, since)
            .await?;
        if let Some(e) = &paged.error {
            warn!(repository = %repository.id, error = %e, "Merged pull requests are partial");
        }

        let mut merged = paged.items;
        merged.sort_by(|a, b| b.merged_at.cmp(&a.merged_at));
        Ok(merged)
    }

    async fn fetch_records(
        &self,
        section: Section,
        repository: &Repository,
    ) -> Result<(SectionRecords, Option<DashError>)> {
        let (owner, name) = (&repository.owner, &repository.name);

        match section {
            Section::PullRequests => {
                let paged = self.client.open_pull_requests(owner, name).await?;
                Ok((SectionRecords::PullRequests(paged.items), paged.error))
            }
            Section::Issues => {
                let paged = self.client.open_issues(owner, name).await?;
                Ok((SectionRecords::Issues(paged.items), paged.error))
            }
            Section::Actions => {
                let paged = self.client.workflow_runs(owner, name).await?;
                let runs = select_configured_runs(paged.items, repository);
                Ok((SectionRecords::Actions(runs), paged.error))
            }
        }
    }

    /// Apply filters and build the view for fetched data.
    async fn present(&self, fetched: Fetched) -> SectionView {
        let Fetched { data, warning, .. } = fetched;
        let repository = data.repository;

        let records = {
            let mut filters = self.filters.lock().await;
            match data.records {
                SectionRecords::PullRequests(prs) => {
                    let state = &mut filters.pull_requests;
                    state.available_users = extract_users(&prs);
                    SectionRecords::PullRequests(state.apply(&prs))
                }
                SectionRecords::Issues(issues) => {
                    let state = &mut filters.issues;
                    state.available_users = extract_users(&issues);
                    SectionRecords::Issues(state.apply(&issues))
                }
                actions @ SectionRecords::Actions(_) => actions,
            }
        };

        let empty_reason = if records.section() == Section::Actions && !repository.has_workflows() {
            EmptyState::NoWorkflowsConfigured
        } else {
            EmptyState::NoMatchingRecords
        };

        SectionView::loaded(
            &repository.id,
            records,
            empty_reason,
            warning.as_ref().map(ViewError::from),
        )
    }

    fn persist(&self, cache: &ResponseCache) {
        if let Some(path) = &self.cache_path {
            if let Err(e) = cache.save(path) {
                warn!(path = %path.display(), error = %e, "Failed to save cache snapshot");
            }
        }
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("client", &self.client)
            .field("repositories", &self.registry.len())
            .field("selection", &*self.selection.borrow())
            .finish_non_exhaustive()
    }
}
