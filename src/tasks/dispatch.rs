//! Stack event dispatcher.
//!
//! The single context that feeds [`ProfileRegistry`]: every stack event is
//! handled to completion, in arrival order, before the next one is taken
//! off the queue.  Between events it polls the provisioning deadline.

use core::time::Duration;

use embassy_sync::channel::DynamicReceiver;
use log::info;

use crate::adapters::time::MonotonicClock;
use crate::app::ports::{DisplayPort, EventSink, LinkStackPort};
use crate::error::LinkError;
use crate::gatt::registry::ProfileRegistry;
use crate::gatt::StackEvent;

/// How often the deadline is checked while the queue is idle.
pub const DEADLINE_POLL: Duration = Duration::from_millis(100);

pub struct Dispatcher<K, D, E> {
    registry: ProfileRegistry,
    link: K,
    display: D,
    sink: E,
    clock: MonotonicClock,
}

impl<K, D, E> Dispatcher<K, D, E>
where
    K: LinkStackPort,
    D: DisplayPort,
    E: EventSink,
{
    pub fn new(registry: ProfileRegistry, link: K, display: D, sink: E, clock: MonotonicClock) -> Self {
        Self {
            registry,
            link,
            display,
            sink,
            clock,
        }
    }

    /// Request registration of `app_id`.  The rest of provisioning is
    /// driven by the confirmations.
    pub fn register(&mut self, app_id: u16) -> Result<(), LinkError> {
        let now = self.clock.uptime_ms();
        self.registry.register(app_id, &mut self.link, now)
    }

    pub fn handle(&mut self, event: &StackEvent) {
        self.registry
            .handle(event, &mut self.link, &mut self.display, &mut self.sink);
    }

    pub fn poll_deadlines(&mut self) {
        let now = self.clock.uptime_ms();
        self.registry.poll_deadlines(now, &mut self.sink);
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Take events until the process ends.
    pub async fn run(mut self, events: DynamicReceiver<'static, StackEvent>) {
        info!("DISPATCH: running");
        loop {
            let next = futures_lite::future::or(async { Some(events.receive().await) }, async {
                async_io_mini::Timer::after(DEADLINE_POLL).await;
                None
            })
            .await;
            if let Some(event) = next {
                self.handle(&event);
            }
            if !self.registry.is_settled() {
                self.poll_deadlines();
            }
        }
    }
}
