//! Call-stack agent: tracks the traversal position and reports the hooks a
//! visited site satisfies.

use super::{HookKind, HookRepository, ObserverId};
use crate::engine::Context;
use crate::lang::{LanguageTranslation, Site};
use crate::rule::MatchContext;
use tracing::trace;

/// One observer to notify for one triggering site.
#[derive(Debug, Clone, Copy)]
pub struct HookEvent<'a> {
    pub hook: usize,
    pub observer: ObserverId,
    pub trigger: Site<'a>,
}

#[derive(Debug, Default)]
pub struct CallStackAgent {
    position: usize,
}

impl CallStackAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to the next node in traversal order.
    pub fn advance(&mut self) -> usize {
        self.position += 1;
        self.position
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Events for every observer registered strictly before the current
    /// position whose hook matches `site`.
    pub fn observe<'a>(
        &self,
        site: &Site<'a>,
        hooks: &HookRepository<'a>,
        lang: &dyn LanguageTranslation,
        ctx: &Context<'a>,
    ) -> Vec<HookEvent<'a>> {
        let match_ctx = MatchContext::for_hook();
        let mut events = Vec::new();
        for (index, hook) in hooks.hooks().iter().enumerate() {
            if hook.observers().is_empty() {
                continue;
            }
            let fires = match hook.kind() {
                HookKind::Parameter { matcher, .. } | HookKind::Return { matcher, .. } => {
                    !matches!(site, Site::EnumSelection(_))
                        && matcher.matches(site, lang, ctx, &match_ctx)
                }
                HookKind::Enum { matcher } => {
                    matches!(site, Site::EnumSelection(_)) && matcher.matches(site, lang, ctx)
                }
            };
            if !fires {
                continue;
            }
            for observer in hook.observers() {
                if observer.registered_at >= self.position {
                    continue;
                }
                trace!(
                    hook = hook.kind().label(),
                    requester = %observer.requester,
                    "hook triggered"
                );
                events.push(HookEvent {
                    hook: index,
                    observer: observer.id(),
                    trigger: *site,
                });
            }
        }
        events
    }
}
