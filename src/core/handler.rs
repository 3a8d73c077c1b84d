use crate::core::aggregator::PassportAggregator;
use crate::core::{Bookmark, Contact, Passport, RemoteFetch, Result, UserId};

/// 對外唯一的操作：驗證 userId 後交給 aggregator
pub struct PassportHandler<B, C>
where
    B: RemoteFetch<Bookmark>,
    C: RemoteFetch<Contact>,
{
    aggregator: PassportAggregator<B, C>,
}

impl<B, C> PassportHandler<B, C>
where
    B: RemoteFetch<Bookmark>,
    C: RemoteFetch<Contact>,
{
    pub fn new(aggregator: PassportAggregator<B, C>) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &PassportAggregator<B, C> {
        &self.aggregator
    }

    pub async fn handle(&self, user_id: &str) -> Result<Passport> {
        let user_id = UserId::parse(user_id)?;
        Ok(self.aggregator.build_passport(&user_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::tests::{bookmark, contact, FakeFetch, Script};
    use crate::core::invoker::ResilientInvoker;
    use crate::utils::error::GatewayError;
    use std::sync::Arc;
    use std::time::Duration;

    fn handler(
        bookmarks: Script<Bookmark>,
        contacts: Script<Contact>,
    ) -> PassportHandler<FakeFetch<Bookmark>, FakeFetch<Contact>> {
        PassportHandler::new(PassportAggregator::new(
            FakeFetch {
                service: "bookmark-service",
                script: bookmarks,
            },
            FakeFetch {
                service: "contact-service",
                script: contacts,
            },
            Arc::new(ResilientInvoker::new(Duration::from_secs(1))),
        ))
    }

    #[tokio::test]
    async fn test_empty_user_id_is_rejected_before_aggregation() {
        let handler = handler(Script::Fail, Script::Fail);

        let result = handler.handle("").await;

        assert!(matches!(result, Err(GatewayError::InvalidRequest { .. })));
        // aggregator 沒有被呼叫，所以沒有任何降級紀錄
        let metrics = handler.aggregator().invoker().metrics();
        assert!(metrics.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_handle_healthy_backend() {
        let handler = handler(
            Script::Respond(vec![bookmark(1, "pwebb")]),
            Script::Respond(vec![contact(1, "pwebb")]),
        );

        let passport = tokio_test::assert_ok!(handler.handle("pwebb").await);

        assert_eq!(passport.user_id.as_str(), "pwebb");
        assert_eq!(passport.bookmarks, vec![bookmark(1, "pwebb")]);
        assert_eq!(passport.contacts, vec![contact(1, "pwebb")]);
    }

    #[tokio::test]
    async fn test_handle_never_fails_for_valid_user() {
        let handler = handler(Script::Fail, Script::Fail);

        let passport = tokio_test::assert_ok!(handler.handle("jlong").await);

        assert!(passport.bookmarks.is_empty());
        assert!(passport.contacts.is_empty());
    }
}
