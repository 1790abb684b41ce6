use super::base::PageContext;
use super::compose::{Composer, ComposerEntry};
use crate::browser::selector::SelectorResolver;
use crate::core::{BrowserTrait, Locator, Step};
use crate::errors::{PublishError, Result};
use crate::types::{ContentItem, Thread};
use tracing::{info, warn};

/// How far a thread got. `error` is set when an item failed and the rest of
/// the thread was abandoned.
#[derive(Debug)]
pub struct ThreadOutcome {
    pub items_published: usize,
    pub error: Option<PublishError>,
}

pub struct ThreadOrchestrator;

impl ThreadOrchestrator {
    /// Publish items in order. The first failure stops the thread; items
    /// already published stay published.
    pub async fn publish<B: BrowserTrait>(ctx: PageContext<'_, B>, thread: &Thread) -> ThreadOutcome {
        if thread.reply_chain && thread.len() > 1 && !ctx.profile.supports_replies() {
            return ThreadOutcome {
                items_published: 0,
                error: Some(PublishError::InvalidInput(format!(
                    "{} has no reply locators, cannot chain a thread",
                    ctx.profile.name
                ))),
            };
        }

        let total = thread.len();
        for (index, item) in thread.items.iter().enumerate() {
            if index > 0 {
                info!("waiting before item {}/{}", index + 1, total);
                ctx.pause(ctx.config.timing.inter_item_delay()).await;
            }

            let result = async {
                let entry = if thread.reply_chain && index > 0 {
                    Self::open_reply(ctx, &thread.items[index - 1]).await?;
                    ComposerEntry::Reply
                } else {
                    ComposerEntry::TopLevel
                };
                Composer::publish_item(ctx, item, entry).await
            }
            .await;

            if let Err(e) = result {
                warn!("item {}/{} failed, abandoning the rest of the thread: {}", index + 1, total, e);
                return ThreadOutcome {
                    items_published: index,
                    error: Some(e),
                };
            }
            info!("published item {}/{}", index + 1, total);
        }

        ThreadOutcome {
            items_published: total,
            error: None,
        }
    }

    /// Go to the timeline and open the reply composer on the item showing
    /// `previous`. Other items on the page are never replied to.
    async fn open_reply<B: BrowserTrait>(ctx: PageContext<'_, B>, previous: &ContentItem) -> Result<()> {
        ctx.navigate(ctx.profile.timeline_url()).await?;

        let marker = reply_marker(previous);
        let candidates: Vec<Locator> = ctx
            .profile
            .candidates(Step::TimelineItem)
            .iter()
            .map(|item| Locator::text(item.base_selector(), marker.as_str()))
            .collect();
        let own = SelectorResolver::resolve(
            ctx.browser,
            ctx.tab,
            None,
            &candidates,
            Step::TimelineItem,
            ctx.probe_timing(),
        )
        .await?;

        let reply = ctx.resolve_within(Some(&own), Step::ReplyControl).await?;
        ctx.browser.click(ctx.tab, &reply).await?;
        ctx.pause(ctx.config.timing.reply_open_delay()).await;
        Ok(())
    }
}

const REPLY_MARKER_CHARS: usize = 40;

/// Leading text of an item, short enough to survive timeline truncation.
fn reply_marker(item: &ContentItem) -> String {
    item.text()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .chars()
        .take(REPLY_MARKER_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::testing::{test_profile, ClickEffect, FakeBrowser, FakeElement, FakeTab, PublishedItem};

    async fn run(browser: &FakeBrowser, thread: &Thread) -> ThreadOutcome {
        let (profile, config) = (test_profile(), Config::default());
        let ctx = PageContext::new(browser, &FakeTab, &profile, &config);
        ThreadOrchestrator::publish(ctx, thread).await
    }

    fn texts(browser: &FakeBrowser) -> Vec<String> {
        browser.published().into_iter().map(|p| p.text).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_in_order() {
        let browser = FakeBrowser::already_logged_in();
        let outcome = run(&browser, &Thread::new(["one", "two", "three"])).await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.items_published, 3);
        assert_eq!(texts(&browser), vec!["one", "two", "three"]);
        assert_eq!(browser.clicks_on("compose"), 3);
        assert_eq!(browser.clicks_on("reply"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn paces_between_items_only() {
        let browser = FakeBrowser::already_logged_in();
        let mut config = Config::default();
        config.timing.inter_item_delay_ms = 60_000;
        let profile = test_profile();
        let ctx = PageContext::new(&browser, &FakeTab, &profile, &config);

        let start = tokio::time::Instant::now();
        ThreadOrchestrator::publish(ctx, &Thread::new(["a", "b"])).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= std::time::Duration::from_secs(60));
        assert!(elapsed < std::time::Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_aborts_the_remainder() {
        let browser = FakeBrowser::already_logged_in().disable_post_for("b");
        let outcome = run(&browser, &Thread::new(["a", "b", "c", "d"])).await;

        assert_eq!(outcome.items_published, 1);
        assert!(matches!(outcome.error, Some(PublishError::SubmitControlUnavailable(_))));
        assert_eq!(texts(&browser), vec!["a"]);
        assert!(browser.typed_into("editor").iter().all(|t| t != "c" && t != "d"));
    }

    #[tokio::test(start_paused = true)]
    async fn first_item_failure_publishes_nothing() {
        let browser = FakeBrowser::already_logged_in().disable_post_for("a");
        let outcome = run(&browser, &Thread::new(["a", "b"])).await;

        assert_eq!(outcome.items_published, 0);
        assert!(browser.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reply_chain_uses_reply_affordance_after_first_item() {
        let browser = FakeBrowser::already_logged_in();
        let thread = Thread::new(["root", "second", "third"]).with_reply_chain(true);

        let outcome = run(&browser, &thread).await;

        assert!(outcome.error.is_none());
        assert_eq!(
            browser.published(),
            vec![
                PublishedItem { text: "root".into(), as_reply: false },
                PublishedItem { text: "second".into(), as_reply: true },
                PublishedItem { text: "third".into(), as_reply: true },
            ]
        );
        assert_eq!(browser.clicks_on("compose"), 1);
        assert_eq!(browser.clicks_on("reply"), 2);
        assert_eq!(browser.clicks_on("reply-post"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_reply_affordance_stops_the_chain() {
        let browser = FakeBrowser::already_logged_in().without("reply");
        let thread = Thread::new(["root", "second"]).with_reply_chain(true);

        let outcome = run(&browser, &thread).await;

        assert_eq!(outcome.items_published, 1);
        assert!(matches!(
            outcome.error,
            Some(PublishError::ElementNotFound { step: Step::ReplyControl })
        ));
        assert_eq!(browser.clicks_on("compose"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reply_chain_needs_reply_locators() {
        let browser = FakeBrowser::already_logged_in();
        let mut profile = test_profile();
        profile.reply_control.clear();
        let config = Config::default();
        let ctx = PageContext::new(&browser, &FakeTab, &profile, &config);

        let outcome =
            ThreadOrchestrator::publish(ctx, &Thread::new(["a", "b"]).with_reply_chain(true)).await;

        assert_eq!(outcome.items_published, 0);
        assert!(matches!(outcome.error, Some(PublishError::InvalidInput(_))));
        assert!(browser.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn replies_to_own_item_not_the_first_on_the_timeline() {
        let browser = FakeBrowser::already_logged_in().with_elements(|elements| {
            elements.insert(
                0,
                FakeElement::new("stranger", Locator::css("article")).with_text("someone else's take"),
            );
            elements.insert(
                1,
                FakeElement::new("stranger-reply", Locator::test_id("reply"))
                    .inside("stranger")
                    .on_click(ClickEffect::OpenReply),
            );
        });
        let thread = Thread::new(["root", "second"]).with_reply_chain(true);

        let outcome = run(&browser, &thread).await;

        assert!(outcome.error.is_none());
        assert_eq!(browser.clicks_on("stranger-reply"), 0);
        assert_eq!(browser.clicks_on("reply"), 1);
        assert_eq!(
            browser.published()[1],
            PublishedItem { text: "second".into(), as_reply: true }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn previous_item_missing_from_timeline_stops_the_chain() {
        let browser = FakeBrowser::already_logged_in().without("article");
        let thread = Thread::new(["root", "second"]).with_reply_chain(true);

        let outcome = run(&browser, &thread).await;

        assert_eq!(outcome.items_published, 1);
        assert!(matches!(
            outcome.error,
            Some(PublishError::ElementNotFound { step: Step::TimelineItem })
        ));
        assert_eq!(browser.clicks_on("reply"), 0);
    }

    #[test]
    fn reply_marker_uses_the_first_line() {
        let item = ContentItem::from("\n  Launch day!  \nmore details below");
        assert_eq!(reply_marker(&item), "Launch day!");
    }
}
