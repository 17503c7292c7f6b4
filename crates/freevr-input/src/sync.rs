//! Frame synchronisation between the processes of one sync-group.
//!
//! Every process reaching [`process_sync`] blocks on the group barrier. The
//! first to arrive copies live input and travel state into the frozen
//! copies, and a second barrier holds everyone until that copy is done.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::context::InputContext;
use crate::{InputError, InputResult};

/// How a process came through a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncArrival {
    /// No sync-group; nobody else was waited for.
    Ungrouped,
    /// 1-based arrival order within the group.
    Order(usize),
}

/// A blocking rendezvous shared by a sync-group.
pub trait SyncBarrier: Send + Sync {
    /// Blocks until every member has arrived or `timeout` passes.
    ///
    /// A timed-out arrival is withdrawn, so the barrier stays usable.
    fn wait(&self, timeout: Option<Duration>) -> InputResult<SyncArrival>;
}

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
}

/// In-process barrier over a condition variable.
///
/// # Example
///
/// ```
/// use freevr_input::{SyncArrival, SyncBarrier, ThreadBarrier};
///
/// let barrier = ThreadBarrier::new(1);
/// assert_eq!(barrier.wait(None).unwrap(), SyncArrival::Order(1));
/// ```
#[derive(Debug)]
pub struct ThreadBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl ThreadBarrier {
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            state: Mutex::new(BarrierState::default()),
            cvar: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }
}

impl SyncBarrier for ThreadBarrier {
    fn wait(&self, timeout: Option<Duration>) -> InputResult<SyncArrival> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        let generation = state.generation;
        state.arrived += 1;
        let order = state.arrived;

        if order == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cvar.notify_all();
            return Ok(SyncArrival::Order(order));
        }

        while state.generation == generation {
            match deadline {
                Some(deadline) => {
                    if self.cvar.wait_until(&mut state, deadline).timed_out()
                        && state.generation == generation
                    {
                        state.arrived -= 1;
                        return Err(InputError::Timeout(format!(
                            "barrier of {} waited out with {} arrived",
                            self.parties, state.arrived
                        )));
                    }
                }
                None => self.cvar.wait(&mut state),
            }
        }
        Ok(SyncArrival::Order(order))
    }
}

/// Synchronises one process with its group and freezes state for the frame.
///
/// The freezing process is the first arrival, or the `designated` process
/// when there is no group. Nothing is frozen while the context is paused.
/// Returns whether this process froze.
pub fn process_sync(
    ctx: &InputContext,
    barrier: Option<&dyn SyncBarrier>,
    designated: bool,
    timeout: Option<Duration>,
) -> InputResult<bool> {
    let arrival = match barrier {
        Some(barrier) => barrier.wait(timeout)?,
        None => SyncArrival::Ungrouped,
    };
    trace!("sync arrival {arrival:?}");

    let freezer = match arrival {
        SyncArrival::Order(1) => true,
        SyncArrival::Ungrouped => designated,
        SyncArrival::Order(_) => false,
    };

    let froze = freezer && !ctx.is_paused();
    if froze {
        ctx.freeze_inputs();
        ctx.freeze_users();
    } else if freezer {
        debug!("paused, skipping freeze");
    }

    if let Some(barrier) = barrier {
        if let Err(err) = barrier.wait(timeout) {
            warn!("waiting for the freeze: {err}");
            return Err(err);
        }
    }
    Ok(froze)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use freevr_common::InputConfig;

    use super::*;
    use crate::device::DriverRegistry;
    use crate::types::InputType;

    fn context() -> Arc<InputContext> {
        let ctx = InputContext::new(InputConfig::default(), &DriverRegistry::new()).unwrap();
        ctx.create_input_map();
        ctx
    }

    #[test]
    fn single_party_never_blocks() {
        let barrier = ThreadBarrier::new(0);
        assert_eq!(barrier.parties(), 1);
        for _ in 0..3 {
            assert_eq!(barrier.wait(None).unwrap(), SyncArrival::Order(1));
        }
    }

    #[test]
    fn orders_are_a_permutation() {
        let barrier = Arc::new(ThreadBarrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || barrier.wait(None).unwrap())
            })
            .collect();
        let mut orders: Vec<_> = handles
            .into_iter()
            .map(|h| match h.join().unwrap() {
                SyncArrival::Order(n) => n,
                SyncArrival::Ungrouped => 0,
            })
            .collect();
        orders.sort_unstable();
        assert_eq!(orders, vec![1, 2, 3, 4]);
    }

    #[test]
    fn timeout_withdraws_the_arrival() {
        let barrier = ThreadBarrier::new(2);
        let err = barrier.wait(Some(Duration::from_millis(20))).unwrap_err();
        assert!(matches!(err, InputError::Timeout(_)));
        assert_eq!(barrier.state.lock().arrived, 0);
    }

    #[test]
    fn ungrouped_designated_process_freezes() {
        let ctx = context();
        let button = ctx.get_from_type_index(InputType::Switch2, 0).unwrap();
        button.assign_switch2(1).unwrap();

        assert!(!process_sync(&ctx, None, false, None).unwrap());
        assert_eq!(button.visren_switch(), 0);
        assert!(process_sync(&ctx, None, true, None).unwrap());
        assert_eq!(button.visren_switch(), 1);
    }

    #[test]
    fn paused_context_skips_the_freeze() {
        let ctx = context();
        let button = ctx.get_from_type_index(InputType::Switch2, 0).unwrap();
        button.assign_switch2(1).unwrap();
        ctx.set_paused(true);
        assert!(!process_sync(&ctx, None, true, None).unwrap());
        assert_eq!(button.visren_switch(), 0);
    }

    #[test]
    fn exactly_one_group_member_freezes() {
        let ctx = context();
        let barrier = Arc::new(ThreadBarrier::new(3));
        let freezes = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                let barrier = Arc::clone(&barrier);
                let freezes = Arc::clone(&freezes);
                thread::spawn(move || {
                    for _ in 0..5 {
                        let group: &dyn SyncBarrier = barrier.as_ref();
                        if process_sync(&ctx, Some(group), false, None).unwrap() {
                            freezes.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(freezes.load(Ordering::Relaxed), 5);
    }
}
