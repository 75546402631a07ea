use std::{ops::Deref, sync::Arc};

use crate::config::BotConfig;
use crate::moderation::ModerationService;

/// Shared state handed to every command and event handler
#[derive(Clone, Debug)]
pub struct Data(pub Arc<DataInner>);

#[derive(Debug)]
pub struct DataInner {
    pub service: ModerationService,
    pub config: BotConfig,
}

impl Data {
    #[must_use]
    pub fn new(service: ModerationService, config: BotConfig) -> Self {
        Self(Arc::new(DataInner { service, config }))
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::testing::{FakeGateway, MemoryBackend};
    use crate::moderation::{GuildStateStore, ServiceSettings};

    #[tokio::test]
    async fn test_clones_share_service() {
        let store = GuildStateStore::open(Arc::new(MemoryBackend::new()))
            .await
            .unwrap();
        let service = ModerationService::new(
            store,
            Arc::new(FakeGateway::new()),
            ServiceSettings::default(),
        );
        let config = BotConfig::from_lookup(|key| (key == "DISCORD_TOKEN").then(|| "t".to_string()))
            .unwrap();

        let data = Data::new(service, config);
        let other = data.clone();
        assert!(Arc::ptr_eq(&data.0, &other.0));
        assert_eq!(other.config.command_prefix, ".");
    }
}
