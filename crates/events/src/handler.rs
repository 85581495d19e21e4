use tracing::warn;

use crate::Subscription;

/// Downstream consumer of published messages (notification sender, report
/// builder, audit log).
///
/// Handlers must be idempotent: the bus delivers at least once.
pub trait EventHandler<M> {
    type Error: core::fmt::Display;

    fn handle(&mut self, message: &M) -> Result<(), Self::Error>;
}

/// Deliver every message currently queued on `subscription` to `handler`.
///
/// Handler failures are logged and skipped so one bad message cannot stall the
/// queue. Returns the number of messages handled successfully.
pub fn drain<M, H>(subscription: &Subscription<M>, handler: &mut H) -> usize
where
    H: EventHandler<M>,
{
    let mut handled = 0;
    while let Ok(message) = subscription.try_recv() {
        match handler.handle(&message) {
            Ok(()) => handled += 1,
            Err(error) => warn!(%error, "event handler failed; message skipped"),
        }
    }
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventBus, InMemoryEventBus};

    struct EvenOnly(Vec<u32>);

    impl EventHandler<u32> for EvenOnly {
        type Error = String;

        fn handle(&mut self, message: &u32) -> Result<(), Self::Error> {
            if message % 2 == 0 {
                self.0.push(*message);
                Ok(())
            } else {
                Err(format!("odd message {message}"))
            }
        }
    }

    #[test]
    fn drain_skips_failures_and_counts_successes() {
        let bus = InMemoryEventBus::new();
        let sub = bus.subscribe();
        for n in 1..=4u32 {
            bus.publish(n).unwrap();
        }

        let mut handler = EvenOnly(Vec::new());
        assert_eq!(drain(&sub, &mut handler), 2);
        assert_eq!(handler.0, vec![2, 4]);
        assert_eq!(drain(&sub, &mut handler), 0);
    }
}
