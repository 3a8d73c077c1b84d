use crate::core::invoker::ResilientInvoker;
use crate::core::{Bookmark, Contact, Passport, RemoteFetch, UserId};
use std::sync::Arc;

/// 同時向 bookmark 與 contact 服務取資料並組成 Passport。
///
/// 兩個分支互不共享可變狀態；其中一個降級不會影響另一個。
pub struct PassportAggregator<B, C>
where
    B: RemoteFetch<Bookmark>,
    C: RemoteFetch<Contact>,
{
    bookmarks: B,
    contacts: C,
    invoker: Arc<ResilientInvoker>,
}

impl<B, C> PassportAggregator<B, C>
where
    B: RemoteFetch<Bookmark>,
    C: RemoteFetch<Contact>,
{
    pub fn new(bookmarks: B, contacts: C, invoker: Arc<ResilientInvoker>) -> Self {
        Self {
            bookmarks,
            contacts,
            invoker,
        }
    }

    pub fn invoker(&self) -> &Arc<ResilientInvoker> {
        &self.invoker
    }

    /// 不會失敗：最壞情況下兩個序列都是空的
    pub async fn build_passport(&self, user_id: &UserId) -> Passport {
        tracing::debug!("Building passport for {}", user_id);

        let (bookmarks, contacts) = tokio::join!(
            self.invoker.protect(
                self.bookmarks.service_name(),
                || self.bookmarks.fetch(user_id),
                Vec::new,
            ),
            self.invoker.protect(
                self.contacts.service_name(),
                || self.contacts.fetch(user_id),
                Vec::new,
            ),
        );

        tracing::info!(
            "📋 Passport for {}: {} bookmarks, {} contacts",
            user_id,
            bookmarks.len(),
            contacts.len()
        );

        Passport::new(user_id.clone(), bookmarks, contacts)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::Result;
    use crate::utils::error::GatewayError;
    use async_trait::async_trait;
    use std::time::Duration;

    /// 依腳本回應的假下游服務
    pub(crate) enum Script<T> {
        Respond(Vec<T>),
        Fail,
        Hang(Duration),
    }

    pub(crate) struct FakeFetch<T> {
        pub(crate) service: &'static str,
        pub(crate) script: Script<T>,
    }

    #[async_trait]
    impl<T: Clone + Send + Sync + 'static> RemoteFetch<T> for FakeFetch<T> {
        fn service_name(&self) -> &str {
            self.service
        }

        async fn fetch(&self, _user_id: &UserId) -> Result<Vec<T>> {
            match &self.script {
                Script::Respond(items) => Ok(items.clone()),
                Script::Fail => Err(GatewayError::NetworkError {
                    service: self.service.to_string(),
                    message: "connection refused".to_string(),
                }),
                Script::Hang(duration) => {
                    tokio::time::sleep(*duration).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    pub(crate) fn bookmark(id: i64, user: &str) -> Bookmark {
        Bookmark {
            id,
            href: Some(format!("http://example.com/{}", id)),
            description: Some(format!("bookmark {}", id)),
            user_id: Some(user.to_string()),
        }
    }

    pub(crate) fn contact(id: i64, user: &str) -> Contact {
        Contact {
            id,
            user_id: Some(user.to_string()),
            first_name: Some("Phil".to_string()),
            last_name: Some("Webb".to_string()),
            email: Some(format!("contact{}@example.com", id)),
        }
    }

    fn aggregator(
        bookmarks: Script<Bookmark>,
        contacts: Script<Contact>,
        invoker: ResilientInvoker,
    ) -> PassportAggregator<FakeFetch<Bookmark>, FakeFetch<Contact>> {
        PassportAggregator::new(
            FakeFetch {
                service: "bookmark-service",
                script: bookmarks,
            },
            FakeFetch {
                service: "contact-service",
                script: contacts,
            },
            Arc::new(invoker),
        )
    }

    #[tokio::test]
    async fn test_build_passport_with_healthy_services() {
        let aggregator = aggregator(
            Script::Respond(vec![bookmark(1, "pwebb"), bookmark(2, "pwebb")]),
            Script::Respond(vec![contact(1, "pwebb")]),
            ResilientInvoker::new(Duration::from_secs(1)),
        );
        let user_id = UserId::parse("pwebb").unwrap();

        let passport = aggregator.build_passport(&user_id).await;

        assert_eq!(passport.user_id, user_id);
        assert_eq!(passport.bookmarks.len(), 2);
        assert_eq!(passport.contacts, vec![contact(1, "pwebb")]);
    }

    #[tokio::test]
    async fn test_failing_bookmarks_do_not_affect_contacts() {
        let contacts = vec![contact(1, "jlong"), contact(2, "jlong")];
        let aggregator = aggregator(
            Script::Fail,
            Script::Respond(contacts.clone()),
            ResilientInvoker::new(Duration::from_secs(1)),
        );

        for user in ["jlong", "pwebb", "dsyer"] {
            let passport = aggregator.build_passport(&UserId::parse(user).unwrap()).await;
            assert!(passport.bookmarks.is_empty());
            assert_eq!(passport.contacts, contacts);
        }

        let metrics = aggregator.invoker().metrics();
        assert_eq!(metrics.get("bookmark-service").degradations, 3);
        assert_eq!(metrics.get("contact-service").successes, 3);
    }

    #[tokio::test]
    async fn test_both_failing_yields_empty_passport() {
        let aggregator = aggregator(
            Script::Fail,
            Script::Fail,
            ResilientInvoker::new(Duration::from_secs(1)),
        );
        let user_id = UserId::parse("pwebb").unwrap();

        let passport = aggregator.build_passport(&user_id).await;

        assert_eq!(passport, Passport::empty(user_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_bounded_by_slowest_budget() {
        let invoker = ResilientInvoker::new(Duration::from_millis(200))
            .with_timeout("contact-service", Duration::from_millis(300));
        let aggregator = aggregator(
            Script::Hang(Duration::from_secs(30)),
            Script::Hang(Duration::from_secs(30)),
            invoker,
        );

        let started = tokio::time::Instant::now();
        let passport = aggregator
            .build_passport(&UserId::parse("pwebb").unwrap())
            .await;
        let elapsed = started.elapsed();

        assert!(passport.bookmarks.is_empty());
        assert!(passport.contacts.is_empty());
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(500), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_bookmarks_do_not_delay_contacts() {
        let aggregator = aggregator(
            Script::Hang(Duration::from_secs(30)),
            Script::Respond(vec![contact(9, "pwebb")]),
            ResilientInvoker::new(Duration::from_millis(250)),
        );

        let started = tokio::time::Instant::now();
        let passport = aggregator
            .build_passport(&UserId::parse("pwebb").unwrap())
            .await;

        assert!(passport.bookmarks.is_empty());
        assert_eq!(passport.contacts.len(), 1);
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
