/// Trait for the component that decides when inactivity fires the locker,
/// the killer or the notifier.
///
/// The watcher reports activity through it and the message bus flips its
/// control flags; neither knows anything about the schedule itself.
pub trait TriggerEngine {
    /// Genuine user activity was observed
    fn on_activity(&mut self);

    /// Disabling pushes the lock trigger to its nominal delay and clears the
    /// kill trigger; enabling resets every trigger
    fn set_disabled(&mut self, disabled: bool);

    fn is_disabled(&self) -> bool;

    /// Restart every trigger from its nominal delay
    fn reset_triggers(&mut self);

    fn request_lock_now(&mut self);

    fn request_unlock_now(&mut self);
}
