//! UI-thread task queue and background workers
//!
//! Register and form state is owned by one thread. Other threads never touch
//! it directly; they post closures through a [`UiHandle`] and the owner runs
//! them with [`UiQueue::run_pending`]. [`Workers`] runs blocking jobs on the
//! tokio blocking pool and posts their results back the same way.

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

type Task<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Queue of closures drained by the thread that owns `S`
pub struct UiQueue<S> {
    sender: UnboundedSender<Task<S>>,
    receiver: UnboundedReceiver<Task<S>>,
}

impl<S: 'static> UiQueue<S> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    pub fn handle(&self) -> UiHandle<S> {
        UiHandle {
            sender: self.sender.clone(),
        }
    }

    /// Run every task queued so far; returns how many ran
    pub fn run_pending(&mut self, state: &mut S) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task(state);
            ran += 1;
        }
        ran
    }

    /// Wait for one task and run it
    pub async fn run_next(&mut self, state: &mut S) -> bool {
        match self.receiver.recv().await {
            Some(task) => {
                task(state);
                true
            }
            None => false,
        }
    }
}

impl<S: 'static> Default for UiQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sendable poster of tasks onto a [`UiQueue`]
pub struct UiHandle<S> {
    sender: UnboundedSender<Task<S>>,
}

impl<S> Clone for UiHandle<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S: 'static> UiHandle<S> {
    /// Queue `task` for the owning thread; false once the queue is gone
    pub fn invoke_later<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.sender.send(Box::new(task)).is_ok()
    }
}

/// State that can tell which account or form is currently active
pub trait Identity {
    type Key: PartialEq + Send + 'static;

    fn active_key(&self) -> Self::Key;
}

/// Background job runner that hands results back to the UI queue
pub struct Workers<S> {
    ui: UiHandle<S>,
    runtime: Handle,
}

impl<S: Identity + 'static> Workers<S> {
    pub fn new(ui: UiHandle<S>, runtime: Handle) -> Self {
        Self { ui, runtime }
    }

    /// Run `work` off-thread, then `apply` its result on the UI thread
    ///
    /// The result is dropped if the state's active key no longer equals
    /// `key` by the time it arrives.
    pub fn spawn_for<T, W, A>(&self, key: S::Key, work: W, apply: A) -> JoinHandle<()>
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        A: FnOnce(&mut S, T) + Send + 'static,
    {
        let ui = self.ui.clone();
        self.runtime.spawn(async move {
            match tokio::task::spawn_blocking(work).await {
                Ok(result) => {
                    let posted = ui.invoke_later(move |state: &mut S| {
                        if state.active_key() == key {
                            apply(state, result);
                        } else {
                            log::debug!("discarding background result for an inactive view");
                        }
                    });
                    if !posted {
                        log::debug!("ui queue closed before background result arrived");
                    }
                }
                Err(e) => log::error!("background task failed: {}", e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Screen {
        active: u32,
        shown: Vec<String>,
    }

    impl Identity for Screen {
        type Key = u32;

        fn active_key(&self) -> u32 {
            self.active
        }
    }

    #[test]
    fn test_invoke_later_runs_on_drain() {
        let mut queue = UiQueue::<Screen>::new();
        let handle = queue.handle();
        let mut screen = Screen::default();

        let poster = std::thread::spawn(move || {
            handle.invoke_later(|s: &mut Screen| s.shown.push("a".to_string()));
            handle.invoke_later(|s: &mut Screen| s.shown.push("b".to_string()));
        });
        poster.join().unwrap();

        assert!(screen.shown.is_empty());
        assert_eq!(queue.run_pending(&mut screen), 2);
        assert_eq!(screen.shown, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_worker_result_applied_for_active_key() {
        let mut queue = UiQueue::<Screen>::new();
        let workers = Workers::new(queue.handle(), Handle::current());
        let mut screen = Screen { active: 7, ..Default::default() };

        workers
            .spawn_for(7, || 40 + 2, |s: &mut Screen, n: i32| s.shown.push(n.to_string()))
            .await
            .unwrap();

        assert!(queue.run_next(&mut screen).await);
        assert_eq!(screen.shown, vec!["42"]);
    }

    #[tokio::test]
    async fn test_worker_result_discarded_for_inactive_key() {
        let mut queue = UiQueue::<Screen>::new();
        let workers = Workers::new(queue.handle(), Handle::current());
        let mut screen = Screen { active: 1, ..Default::default() };

        workers
            .spawn_for(2, || "stale".to_string(), |s: &mut Screen, v: String| s.shown.push(v))
            .await
            .unwrap();

        assert_eq!(queue.run_pending(&mut screen), 1);
        assert!(screen.shown.is_empty());
    }
}
