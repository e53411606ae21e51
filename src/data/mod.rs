// src/data/mod.rs
use core::sync::atomic::AtomicBool;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use nalgebra::Vector3;

use crate::config::flight::{follower, horizontal_vel_pid};

/// Размеры буферов каналов
const OBJECTIVE_CHANNEL_SIZE: usize = 4;
const SETTINGS_CHANNEL_SIZE: usize = 2;

/// Измеренная скорость в осях North-East-Down (м/с)
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VelocityState {
    pub north: f32,
    pub east: f32,
    pub down: f32,
}

/// Измеренная позиция в осях North-East-Down (м)
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionState {
    pub north: f32,
    pub east: f32,
    pub down: f32,
}

/// Измеренная ориентация (градусы)
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttitudeState {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Ручное управление: нормализованное отклонение ручки рыскания (-1.0 - 1.0)
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManualControlCommand {
    pub yaw: f32,
}

/// Коэффициенты ПИД контура скорости
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VelocityPidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub i_limit: f32,
}

/// Политика управления рысканием в режиме скоростного руления
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum YawControl {
    /// Рыскание от ручки оператора
    Manual,
    /// Нос по направлению движения
    MovementDirection,
    /// Нос по направлению траектории (обрабатывается другими режимами)
    PathDirection,
}

/// Снимок настроек подсистемы следования
///
/// Заменяется целиком при изменении конфигурации, после замены обязателен
/// вызов `settings_updated` у активного контроллера.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FollowerSettings {
    /// ПИД контура горизонтальной скорости
    pub horizontal_vel_pid: VelocityPidGains,
    /// Период цикла управления (мс)
    pub update_period_ms: u16,
    /// Максимальная горизонтальная скорость (м/с)
    pub horizontal_vel_max: f32,
    /// Позиционная подпитка контура скорости
    pub horizontal_pos_p: f32,
    /// Максимальный угол крена/тангажа (градусы)
    pub max_roll_pitch: f32,
    /// Упреждение по скорости
    pub velocity_feedforward: f32,
    /// Политика рыскания
    pub yaw_control: YawControl,
}

impl Default for FollowerSettings {
    fn default() -> Self {
        Self {
            horizontal_vel_pid: VelocityPidGains {
                kp: horizontal_vel_pid::KP,
                ki: horizontal_vel_pid::KI,
                kd: horizontal_vel_pid::KD,
                i_limit: horizontal_vel_pid::I_LIMIT,
            },
            update_period_ms: follower::UPDATE_PERIOD_MS,
            horizontal_vel_max: follower::HORIZONTAL_VEL_MAX,
            horizontal_pos_p: follower::HORIZONTAL_POS_P,
            max_roll_pitch: follower::MAX_ROLL_PITCH_DEG,
            velocity_feedforward: follower::VELOCITY_FEEDFORWARD,
            yaw_control: YawControl::Manual,
        }
    }
}

/// Режим стабилизации по оси
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StabilizationMode {
    /// Удержание абсолютного угла
    Attitude,
    /// Команда скорости с фиксацией оси при нуле
    AxisLock,
    /// Вертикальный канал: удержание высоты с вариометром
    AltitudeVario,
}

/// Команда контуру стабилизации
///
/// Формируется заново каждый цикл, частичных обновлений нет.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StabilizationDesired {
    /// Крен (градусы)
    pub roll: f32,
    /// Тангаж (градусы)
    pub pitch: f32,
    /// Рыскание: абсолютный угол (градусы) либо скорость (градусы/с),
    /// в зависимости от политики рыскания
    pub yaw: f32,
    /// Тяга, задается контуром высоты
    pub thrust: f32,
    pub roll_mode: StabilizationMode,
    pub pitch_mode: StabilizationMode,
    pub yaw_mode: StabilizationMode,
    pub thrust_mode: StabilizationMode,
}

/// Статус следования по траектории
#[derive(Clone, Copy, Debug)]
pub struct PathStatus {
    /// Ошибка следования; для скоростного руления всегда 0
    pub error: f32,
    /// Доля пройденного пути; для скоростного руления всегда 0
    pub fractional_progress: f32,
    /// Направление траектории (желаемая скорость, NED)
    pub path_direction: Vector3<f32>,
    /// Мгновенная ошибка отслеживания скорости (NED)
    pub correction_direction: Vector3<f32>,
}

/// Тег режима следования для внешнего диспетчера
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PathMode {
    /// Скоростное руление
    Velocity,
    /// Полет в конечную точку / удержание позиции
    GotoEndpoint,
}

/// Цель следования
#[derive(Clone, Copy, Debug)]
pub enum PathObjective {
    /// Отслеживание горизонтального вектора скорости (Down игнорируется)
    Velocity { velocity: Vector3<f32> },
    /// Полет в точку; при `start == end` - удержание позиции
    GotoEndpoint {
        start: Vector3<f32>,
        end: Vector3<f32>,
        starting_velocity: f32,
        ending_velocity: f32,
    },
}

impl PathObjective {
    /// Тег режима цели
    pub fn mode(&self) -> PathMode {
        match self {
            PathObjective::Velocity { .. } => PathMode::Velocity,
            PathObjective::GotoEndpoint { .. } => PathMode::GotoEndpoint,
        }
    }

    /// Цель удержания текущей позиции
    pub fn hold_at(position: &PositionState) -> Self {
        let point = Vector3::new(position.north, position.east, position.down);
        PathObjective::GotoEndpoint {
            start: point,
            end: point,
            starting_velocity: 0.0,
            ending_velocity: 0.0,
        }
    }
}

/// Входной снимок одного цикла управления
///
/// Копируется из оценщика состояния и источников ввода непосредственно
/// перед вызовом, между циклами не кэшируется.
#[derive(Clone, Copy, Debug)]
pub struct FollowerInput {
    pub velocity: VelocityState,
    pub position: PositionState,
    pub attitude: AttitudeState,
    pub manual: ManualControlCommand,
    /// Максимальная скорость рыскания из банка стабилизации (градусы/с)
    pub max_yaw_rate: f32,
}

/// Результат одного цикла управления
#[derive(Clone, Copy, Debug)]
pub struct FollowerOutput {
    /// Желаемая скорость (NED, Down всегда 0)
    pub velocity_desired: Vector3<f32>,
    /// Команда контуру стабилизации
    pub stabilization: StabilizationDesired,
    /// Статус следования
    pub status: PathStatus,
    /// Цель удержания позиции при отказе контура, иначе `None`
    pub fallback: Option<PathObjective>,
}

/// Каналы доставки целей и настроек в задачу следования
pub struct FollowerChannels {
    /// Смена цели от слоя планирования
    pub objective_channel: Channel<CriticalSectionRawMutex, PathObjective, OBJECTIVE_CHANNEL_SIZE>,
    /// Замена снимка настроек
    pub settings_channel: Channel<CriticalSectionRawMutex, FollowerSettings, SETTINGS_CHANNEL_SIZE>,
}

/// Общее состояние подсистемы следования
pub struct FollowerState {
    /// Признак включения режима внешним диспетчером
    pub engaged: AtomicBool,
    /// Последний входной снимок от оценщика состояния
    pub last_input: Mutex<CriticalSectionRawMutex, Option<FollowerInput>>,
    /// Последний результат цикла управления
    pub last_output: Mutex<CriticalSectionRawMutex, Option<FollowerOutput>>,
}

impl FollowerChannels {
    pub const fn new() -> Self {
        Self {
            objective_channel: Channel::new(),
            settings_channel: Channel::new(),
        }
    }
}

impl FollowerState {
    pub const fn new() -> Self {
        Self {
            engaged: AtomicBool::new(false),
            last_input: Mutex::new(None),
            last_output: Mutex::new(None),
        }
    }
}

// Статические экземпляры для глобального доступа
pub static CHANNELS: FollowerChannels = FollowerChannels::new();
pub static FOLLOWER_STATE: FollowerState = FollowerState::new();
