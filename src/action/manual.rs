//! Explicitly fired actions.
//!
//! A manual trigger is a deferred pulse: the trigger/release pair runs
//! during the next flush, after pending staging, so a queued manual action
//! is never rejected by its own release.

use crate::action::core::TriggerData;
use crate::action::{Action, Kind};

pub(crate) fn trigger(action: &Action, data: TriggerData) {
    if !matches!(action.inner.kind, Kind::Manual) {
        log::warn!(
            "trigger() ignored on {:?}: only manual actions fire explicitly",
            action
        );
        return;
    }
    let Some(ctx) = action.inner.core.context() else {
        return;
    };

    let weak = action.weak();
    ctx.defer_call(Box::new(move || {
        if let Some(inner) = weak.upgrade() {
            inner.core.set_triggered(true, false, data);
            inner.core.set_triggered(false, false, TriggerData::None);
        }
    }));
}
