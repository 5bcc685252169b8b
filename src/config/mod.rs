//! Configuration module

mod site;

pub use site::CacheConfig;
pub use site::GithubConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
