//! Routes warnings logged anywhere in the process into the UI.
//!
//! [`NoticeLayer`] is installed once in the tracing subscriber. The render
//! loop registers a sink for the lifetime of the session; while no sink is
//! registered the layer drops everything.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tokio::sync::mpsc::UnboundedSender;
use tracing::Event;
use tracing::Level;
use tracing::field::Field;
use tracing::field::Visit;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

struct Slot {
    id: u64,
    sink: UnboundedSender<Notice>,
}

#[derive(Clone, Default)]
pub struct NoticeRegistry {
    slot: Arc<Mutex<Option<Slot>>>,
    next_id: Arc<AtomicU64>,
}

impl NoticeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Slot>> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Install `sink`, replacing any previous one. The sink stays registered
    /// until the returned guard is dropped.
    #[must_use]
    pub fn register(&self, sink: UnboundedSender<Notice>) -> NoticeGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.lock() = Some(Slot { id, sink });
        NoticeGuard {
            registry: self.clone(),
            id,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.lock().is_some()
    }

    fn publish(&self, notice: Notice) {
        if let Some(slot) = self.lock().as_ref() {
            slot.sink.send(notice).ok();
        }
    }

    pub fn layer(&self) -> NoticeLayer {
        NoticeLayer {
            registry: self.clone(),
        }
    }
}

pub struct NoticeGuard {
    registry: NoticeRegistry,
    id: u64,
}

impl Drop for NoticeGuard {
    fn drop(&mut self) {
        let mut slot = self.registry.lock();
        if slot.as_ref().is_some_and(|slot| slot.id == self.id) {
            *slot = None;
        }
    }
}

#[derive(Clone)]
pub struct NoticeLayer {
    registry: NoticeRegistry,
}

impl<S> Layer<S> for NoticeLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = match *event.metadata().level() {
            Level::ERROR => NoticeLevel::Error,
            Level::WARN => NoticeLevel::Warning,
            _ => return,
        };
        let mut visitor = NoticeVisitor::default();
        event.record(&mut visitor);
        self.registry.publish(Notice {
            level,
            text: visitor.finish(),
        });
    }
}

#[derive(Default)]
struct NoticeVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl NoticeVisitor {
    fn finish(self) -> String {
        let mut text = self.message.unwrap_or_default();
        for field in self.fields {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&field);
        }
        text
    }
}

impl Visit for NoticeVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::unbounded_channel;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn forwards_warnings_only_while_registered() {
        let registry = NoticeRegistry::new();
        let subscriber = tracing_subscriber::registry().with(registry.layer());
        let (tx, mut rx) = unbounded_channel();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("before register");
            let guard = registry.register(tx);
            tracing::info!("too quiet");
            tracing::warn!(attempt = 2, "retrying model call");
            tracing::error!("fatal");
            drop(guard);
            tracing::warn!("after unregister");
        });

        assert_eq!(
            rx.try_recv().ok(),
            Some(Notice {
                level: NoticeLevel::Warning,
                text: "retrying model call attempt=2".to_string(),
            })
        );
        assert_eq!(
            rx.try_recv().ok().map(|notice| notice.level),
            Some(NoticeLevel::Error)
        );
        assert!(rx.try_recv().is_err());
        assert!(!registry.is_registered());
    }

    #[test]
    fn stale_guard_does_not_unregister_newer_sink() {
        let registry = NoticeRegistry::new();
        let (first_tx, _first_rx) = unbounded_channel();
        let (second_tx, _second_rx) = unbounded_channel();
        let first = registry.register(first_tx);
        let second = registry.register(second_tx);
        drop(first);
        assert!(registry.is_registered());
        drop(second);
        assert!(!registry.is_registered());
    }
}
