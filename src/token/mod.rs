// Token provider module.
// Stores the optional bearer token and loads it from the environment or a broker.

pub mod source;
pub mod store;

pub use source::{BrokerTokenSource, EnvTokenSource, TokenSource};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
