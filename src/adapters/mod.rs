// Adapters layer: concrete implementations of the domain ports (site, webhook, release feed, state,
// shared characteristics) plus the inbound REST surface.

pub mod characteristics;
pub mod http;
pub mod notification;
pub mod release;
pub mod rest;
pub mod scraping;
pub mod state;

pub use characteristics::InMemoryCharacteristicsStore;
pub use notification::{DiscordNotifier, NotificationTemplates, WebhookClient};
pub use release::GithubReleaseFeed;
pub use scraping::KralandScraper;
pub use state::InMemoryStateStore;
