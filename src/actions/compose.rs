use super::base::PageContext;
use crate::browser::selector::SelectorResolver;
use crate::core::{BrowserTrait, Step};
use crate::errors::{PublishError, Result};
use crate::types::ContentItem;
use tracing::{debug, info};

/// How the composer surface for an item is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerEntry {
    /// Open a fresh top-level composer.
    TopLevel,
    /// A reply composer has already been opened on the previous item.
    Reply,
}

pub struct Composer;

impl Composer {
    /// Type `item` into the composer and submit it, then wait out the post dwell.
    pub async fn publish_item<B: BrowserTrait>(
        ctx: PageContext<'_, B>,
        item: &ContentItem,
        entry: ComposerEntry,
    ) -> Result<()> {
        let timing = &ctx.config.timing;
        info!("composing: \"{}\"", item.preview(50));

        if entry == ComposerEntry::TopLevel {
            let open = ctx.resolve(Step::ComposerOpen).await?;
            ctx.browser.click(ctx.tab, &open).await?;
            ctx.pause(timing.composer_open_delay()).await;
        }

        let field = ctx.resolve(Step::ComposerField).await?;
        ctx.browser.click(ctx.tab, &field).await?;
        ctx.pause(timing.focus_delay()).await;
        ctx.browser
            .type_text(ctx.tab, &field, item.text(), timing.content_keystroke())
            .await?;
        ctx.pause(timing.pre_submit_delay()).await;

        let candidates = match entry {
            ComposerEntry::TopLevel => ctx.profile.candidates(Step::PostControl),
            ComposerEntry::Reply => ctx.profile.reply_submit_candidates(),
        };
        let submit = SelectorResolver::find_enabled(
            ctx.browser,
            ctx.tab,
            None,
            candidates,
            Step::PostControl,
            ctx.probe_timing(),
        )
        .await?
        .ok_or_else(|| {
            PublishError::SubmitControlUnavailable(format!(
                "no enabled post control among {} candidates",
                candidates.len()
            ))
        })?;

        ctx.browser.click(ctx.tab, &submit).await?;
        debug!("clicked post control");

        // No read-back: the dwell is the only acceptance signal.
        ctx.pause(ctx.profile.post_dwell(timing.post_dwell())).await;
        Ok(())
    }
}
