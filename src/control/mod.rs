//! Контроллеры режимов следования по траектории

pub mod ne_pid;
pub mod velocity;

pub use ne_pid::NeControl;
pub use velocity::VelocityRoamController;

/// Ошибки цикла управления
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FollowerError {
    /// Внутренний контроллер выдал нечисловую команду
    NonFiniteCommand,
}
