//! Контроллер режима скоростного руления (velocity roam)
//!
//! Преобразует заданный горизонтальный вектор скорости в команды
//! ориентации. Контур скорости считает внутренний контроллер North/East,
//! здесь только обвязка: состояние активности, передача настроек и
//! измерений, поворот команды в связанные оси по текущему рысканию,
//! политика рыскания и откат к удержанию позиции при отказе.

use nalgebra::{Vector2, Vector3};

use crate::control::ne_pid::NeControl;
use crate::control::FollowerError;
use crate::data::{
    FollowerInput, FollowerOutput, FollowerSettings, PathMode, PathObjective, PathStatus,
    StabilizationDesired, StabilizationMode, YawControl,
};
use crate::utils::math::{constrain, course_bearing_deg, deg_to_rad};

/// Контроллер скоростного руления
///
/// Владеет снимком настроек и внутренним контроллером North/East.
/// Экземпляр принадлежит диспетчеру режимов и вызывается из одного
/// контекста исполнения: планировщик дергает [`Self::update_autopilot`]
/// раз в период, смена настроек и цели приходят между циклами.
pub struct VelocityRoamController<C: NeControl> {
    /// Снимок настроек подсистемы следования
    settings: FollowerSettings,
    /// Внутренний контроллер North/East
    control_ne: C,
    /// Флаг активности режима
    active: bool,
}

impl<C: NeControl> VelocityRoamController<C> {
    /// Создание контроллера с привязкой настроек
    pub fn new(settings: FollowerSettings, control_ne: C) -> Self {
        Self {
            settings,
            control_ne,
            active: false,
        }
    }

    /// Включение режима
    ///
    /// Повторный вызов в активном состоянии не имеет эффекта; интеграторы
    /// внутреннего контроллера сбрасываются ровно один раз на переходе.
    pub fn activate(&mut self) {
        if !self.active {
            self.active = true;
            self.push_settings();
            self.control_ne.activate();
            info!("Скоростное руление: режим включен");
        }
    }

    /// Выключение режима, безопасно в любой момент между циклами
    pub fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            self.control_ne.deactivate();
            info!("Скоростное руление: режим выключен");
        }
    }

    /// Активен ли режим
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Тег режима для внешнего диспетчера
    pub fn mode(&self) -> PathMode {
        PathMode::Velocity
    }

    /// Текущий снимок настроек
    pub fn settings(&self) -> &FollowerSettings {
        &self.settings
    }

    /// Замена снимка настроек с передачей во внутренний контроллер
    pub fn settings_updated(&mut self, settings: &FollowerSettings) {
        self.settings = *settings;
        self.push_settings();
    }

    /// Передача текущих настроек внутреннему контроллеру
    fn push_settings(&mut self) {
        let settings = &self.settings;
        // Период цикла: мс -> с
        let dt = f32::from(settings.update_period_ms) / 1000.0;

        self.control_ne.update_parameters(
            settings.horizontal_vel_pid.kp,
            settings.horizontal_vel_pid.ki,
            settings.horizontal_vel_pid.kd,
            settings.horizontal_vel_pid.i_limit,
            dt,
            settings.horizontal_vel_max,
        );
        self.control_ne
            .update_positional_parameters(settings.horizontal_pos_p);
        self.control_ne.update_command_parameters(
            -settings.max_roll_pitch,
            settings.max_roll_pitch,
            settings.velocity_feedforward,
        );
    }

    /// Прием новой цели
    ///
    /// Уставкой становятся компоненты North/East, вертикальная составляющая
    /// этим контроллером не командуется. Цель другого режима игнорируется.
    pub fn objective_updated(&mut self, objective: &PathObjective) {
        match objective {
            PathObjective::Velocity { velocity } => {
                self.control_ne
                    .update_velocity_setpoint(Vector2::new(velocity.x, velocity.y));
            }
            _ => {
                warn!("Скоростное руление: цель не содержит уставки скорости");
            }
        }
    }

    /// Один цикл управления
    ///
    /// Вызывается планировщиком раз в период только в активном режиме.
    /// При отказе контура возвращает нейтральную команду и цель удержания
    /// текущей позиции, которую диспетчер публикует вместо текущей.
    pub fn update_autopilot(&mut self, input: &FollowerInput) -> FollowerOutput {
        let (velocity_desired, status) = self.update_velocity_desired(input);

        // Выбор политики рыскания
        let (yaw_attitude, yaw) = match self.settings.yaw_control {
            YawControl::Manual => (false, 0.0),
            YawControl::MovementDirection => (
                true,
                course_bearing_deg(input.velocity.north, input.velocity.east),
            ),
            // Прочие политики в этом режиме эквивалентны ручному рысканию
            _ => (false, 0.0),
        };

        match self.update_stabilization_desired(input, yaw_attitude, yaw) {
            Ok(stabilization) => FollowerOutput {
                velocity_desired,
                stabilization,
                status,
                fallback: None,
            },
            Err(FollowerError::NonFiniteCommand) => {
                warn!("Скоростное руление: отказ контура, переход к удержанию позиции");
                FollowerOutput {
                    velocity_desired,
                    stabilization: Self::safe_stabilization(),
                    status,
                    fallback: Some(PathObjective::hold_at(&input.position)),
                }
            }
        }
    }

    /// Подача измерения в контур скорости, желаемая скорость и статус
    fn update_velocity_desired(&mut self, input: &FollowerInput) -> (Vector3<f32>, PathStatus) {
        self.control_ne
            .update_velocity_state(Vector2::new(input.velocity.north, input.velocity.east));

        let desired = self.control_ne.velocity_desired();
        // Вертикальный канал этим контроллером не управляется
        let velocity_desired = Vector3::new(desired.x, desired.y, 0.0);

        let status = PathStatus {
            error: 0.0,
            fractional_progress: 0.0,
            path_direction: velocity_desired,
            correction_direction: Vector3::new(
                desired.x - input.velocity.north,
                desired.y - input.velocity.east,
                0.0,
            ),
        };

        (velocity_desired, status)
    }

    /// Поворот команды North/East в связанные оси и команда стабилизации
    ///
    /// Отказ фиксируется по нечисловой команде внутреннего контроллера.
    fn update_stabilization_desired(
        &mut self,
        input: &FollowerInput,
        yaw_attitude: bool,
        yaw_direction: f32,
    ) -> Result<StabilizationDesired, FollowerError> {
        let command = self.control_ne.ne_command();
        if !command.x.is_finite() || !command.y.is_finite() {
            return Err(FollowerError::NonFiniteCommand);
        }

        let angle = deg_to_rad(input.attitude.yaw);
        let cos_angle = libm::cosf(angle);
        let sin_angle = libm::sinf(angle);
        let max_pitch = self.settings.max_roll_pitch;

        let pitch = constrain(
            -command.x * cos_angle - command.y * sin_angle,
            -max_pitch,
            max_pitch,
        );
        let roll = constrain(
            -command.x * sin_angle + command.y * cos_angle,
            -max_pitch,
            max_pitch,
        );

        // Рыскание: фиксированный курс либо скорость от ручки
        let yaw = if yaw_attitude {
            yaw_direction
        } else {
            input.max_yaw_rate * input.manual.yaw
        };

        Ok(StabilizationDesired {
            roll,
            pitch,
            yaw,
            thrust: 0.0,
            roll_mode: StabilizationMode::Attitude,
            pitch_mode: StabilizationMode::Attitude,
            yaw_mode: StabilizationMode::AxisLock,
            thrust_mode: StabilizationMode::AltitudeVario,
        })
    }

    /// Нейтральная команда при отказе: горизонт, без вращения по рысканию
    fn safe_stabilization() -> StabilizationDesired {
        StabilizationDesired {
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            thrust: 0.0,
            roll_mode: StabilizationMode::Attitude,
            pitch_mode: StabilizationMode::Attitude,
            yaw_mode: StabilizationMode::AxisLock,
            thrust_mode: StabilizationMode::AltitudeVario,
        }
    }
}

// Тесты для отладки на хосте
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        AttitudeState, ManualControlCommand, PositionState, VelocityPidGains, VelocityState,
    };
    use approx::assert_relative_eq;

    /// Заглушка внутреннего контроллера, записывает вызовы контракта
    struct StubNe {
        activations: u32,
        deactivations: u32,
        parameters: Option<(f32, f32, f32, f32, f32, f32)>,
        pos_p: Option<f32>,
        command_parameters: Option<(f32, f32, f32)>,
        setpoint: Option<Vector2<f32>>,
        setpoint_updates: u32,
        state: Option<Vector2<f32>>,
        velocity_desired: Vector2<f32>,
        ne_command: Vector2<f32>,
    }

    impl StubNe {
        fn new() -> Self {
            Self {
                activations: 0,
                deactivations: 0,
                parameters: None,
                pos_p: None,
                command_parameters: None,
                setpoint: None,
                setpoint_updates: 0,
                state: None,
                velocity_desired: Vector2::zeros(),
                ne_command: Vector2::zeros(),
            }
        }
    }

    impl NeControl for StubNe {
        fn activate(&mut self) {
            self.activations += 1;
        }

        fn deactivate(&mut self) {
            self.deactivations += 1;
        }

        fn update_parameters(
            &mut self,
            kp: f32,
            ki: f32,
            kd: f32,
            i_limit: f32,
            dt: f32,
            velocity_max: f32,
        ) {
            self.parameters = Some((kp, ki, kd, i_limit, dt, velocity_max));
        }

        fn update_positional_parameters(&mut self, pos_p: f32) {
            self.pos_p = Some(pos_p);
        }

        fn update_command_parameters(
            &mut self,
            min_command: f32,
            max_command: f32,
            velocity_feedforward: f32,
        ) {
            self.command_parameters = Some((min_command, max_command, velocity_feedforward));
        }

        fn update_velocity_setpoint(&mut self, setpoint: Vector2<f32>) {
            self.setpoint = Some(setpoint);
            self.setpoint_updates += 1;
        }

        fn update_velocity_state(&mut self, state: Vector2<f32>) {
            self.state = Some(state);
        }

        fn velocity_desired(&self) -> Vector2<f32> {
            self.velocity_desired
        }

        fn ne_command(&self) -> Vector2<f32> {
            self.ne_command
        }
    }

    fn test_settings() -> FollowerSettings {
        FollowerSettings {
            horizontal_vel_pid: VelocityPidGains {
                kp: 1.0,
                ki: 0.0,
                kd: 0.0,
                i_limit: 10.0,
            },
            update_period_ms: 20,
            horizontal_vel_max: 5.0,
            horizontal_pos_p: 1.0,
            max_roll_pitch: 35.0,
            velocity_feedforward: 0.0,
            yaw_control: YawControl::Manual,
        }
    }

    fn test_input() -> FollowerInput {
        FollowerInput {
            velocity: VelocityState {
                north: 2.0,
                east: 0.0,
                down: 0.0,
            },
            position: PositionState {
                north: 10.0,
                east: -5.0,
                down: -40.0,
            },
            attitude: AttitudeState {
                roll: 0.0,
                pitch: 0.0,
                yaw: 0.0,
            },
            manual: ManualControlCommand { yaw: 0.0 },
            max_yaw_rate: 180.0,
        }
    }

    fn make_controller() -> VelocityRoamController<StubNe> {
        VelocityRoamController::new(test_settings(), StubNe::new())
    }

    #[test]
    fn test_activation_resets_inner_once() {
        let mut controller = make_controller();
        assert!(!controller.is_active());

        controller.activate();
        controller.activate();

        assert!(controller.is_active());
        assert_eq!(controller.control_ne.activations, 1);
        // При включении настройки переданы внутреннему контроллеру
        assert!(controller.control_ne.parameters.is_some());
    }

    #[test]
    fn test_reactivation_resets_again() {
        let mut controller = make_controller();

        controller.activate();
        controller.deactivate();
        controller.deactivate();
        controller.activate();

        assert_eq!(controller.control_ne.activations, 2);
        assert_eq!(controller.control_ne.deactivations, 1);
    }

    #[test]
    fn test_mode_tag() {
        let controller = make_controller();
        assert_eq!(controller.mode(), PathMode::Velocity);
    }

    #[test]
    fn test_settings_propagation() {
        let mut controller = make_controller();
        controller.settings_updated(&test_settings());

        let (kp, ki, kd, i_limit, dt, velocity_max) =
            controller.control_ne.parameters.expect("нет параметров");
        assert_eq!(kp, 1.0);
        assert_eq!(ki, 0.0);
        assert_eq!(kd, 0.0);
        assert_eq!(i_limit, 10.0);
        assert_eq!(dt, 0.02);
        assert_eq!(velocity_max, 5.0);

        assert_eq!(controller.control_ne.pos_p, Some(1.0));
        assert_eq!(
            controller.control_ne.command_parameters,
            Some((-35.0, 35.0, 0.0))
        );
    }

    #[test]
    fn test_objective_setpoint_idempotent() {
        let mut controller = make_controller();
        let objective = PathObjective::Velocity {
            velocity: Vector3::new(3.0, -1.5, 9.9),
        };

        controller.objective_updated(&objective);
        controller.objective_updated(&objective);

        assert_eq!(controller.control_ne.setpoint_updates, 2);
        // Уставка не меняется при повторной подаче той же цели,
        // вертикальная составляющая отброшена
        assert_eq!(
            controller.control_ne.setpoint,
            Some(Vector2::new(3.0, -1.5))
        );
    }

    #[test]
    fn test_foreign_objective_keeps_setpoint() {
        let mut controller = make_controller();
        controller.objective_updated(&PathObjective::Velocity {
            velocity: Vector3::new(1.0, 2.0, 0.0),
        });

        controller.objective_updated(&PathObjective::hold_at(&PositionState::default()));

        assert_eq!(controller.control_ne.setpoint, Some(Vector2::new(1.0, 2.0)));
        assert_eq!(controller.control_ne.setpoint_updates, 1);
    }

    #[test]
    fn test_rotation_at_zero_yaw() {
        let mut controller = make_controller();
        controller.activate();
        controller.control_ne.ne_command = Vector2::new(1.5, 0.5);

        let output = controller.update_autopilot(&test_input());

        // При нулевом рыскании: pitch = -north, roll = east
        assert_relative_eq!(output.stabilization.pitch, -1.5, epsilon = 1e-5);
        assert_relative_eq!(output.stabilization.roll, 0.5, epsilon = 1e-5);
        assert_eq!(output.stabilization.roll_mode, StabilizationMode::Attitude);
        assert_eq!(output.stabilization.pitch_mode, StabilizationMode::Attitude);
    }

    #[test]
    fn test_rotation_preserves_magnitude() {
        let mut controller = make_controller();
        controller.activate();
        controller.control_ne.ne_command = Vector2::new(2.0, 1.0);

        let mut input = test_input();
        input.attitude.yaw = 37.0;
        let output = controller.update_autopilot(&input);

        let magnitude = output.stabilization.pitch * output.stabilization.pitch
            + output.stabilization.roll * output.stabilization.roll;
        assert_relative_eq!(magnitude, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_rotation_clamps_to_max_angle() {
        let mut controller = make_controller();
        controller.activate();
        controller.control_ne.ne_command = Vector2::new(100.0, -80.0);

        let mut input = test_input();
        input.attitude.yaw = 63.0;
        let output = controller.update_autopilot(&input);

        assert!(output.stabilization.pitch.abs() <= 35.0);
        assert!(output.stabilization.roll.abs() <= 35.0);
    }

    #[test]
    fn test_manual_yaw_from_stick() {
        let mut controller = make_controller();
        controller.activate();

        let mut input = test_input();
        input.manual.yaw = 0.5;
        input.max_yaw_rate = 90.0;
        let output = controller.update_autopilot(&input);

        // Политика MANUAL: скорость рыскания от ручки, курс не навязывается
        assert_relative_eq!(output.stabilization.yaw, 45.0, epsilon = 1e-5);
        assert_eq!(output.stabilization.yaw_mode, StabilizationMode::AxisLock);
        assert_eq!(
            output.stabilization.thrust_mode,
            StabilizationMode::AltitudeVario
        );
    }

    #[test]
    fn test_movement_direction_yaw() {
        let mut settings = test_settings();
        settings.yaw_control = YawControl::MovementDirection;
        let mut controller = VelocityRoamController::new(settings, StubNe::new());
        controller.activate();

        let mut input = test_input();
        input.velocity = VelocityState {
            north: 0.0,
            east: 3.0,
            down: 0.0,
        };
        let output = controller.update_autopilot(&input);

        // Нос по направлению движения: atan2(3, 0) = 90 градусов
        assert_relative_eq!(output.stabilization.yaw, 90.0, epsilon = 1e-4);
        assert_eq!(output.stabilization.yaw_mode, StabilizationMode::AxisLock);
    }

    #[test]
    fn test_velocity_desired_and_status() {
        let mut controller = make_controller();
        controller.activate();
        controller.control_ne.velocity_desired = Vector2::new(3.0, 4.0);

        let mut input = test_input();
        input.velocity = VelocityState {
            north: 1.0,
            east: 1.0,
            down: -0.5,
        };
        let output = controller.update_autopilot(&input);

        // Измерение передано внутреннему контроллеру
        assert_eq!(controller.control_ne.state, Some(Vector2::new(1.0, 1.0)));

        assert_eq!(output.velocity_desired, Vector3::new(3.0, 4.0, 0.0));
        assert_eq!(output.status.error, 0.0);
        assert_eq!(output.status.fractional_progress, 0.0);
        assert_eq!(output.status.path_direction, Vector3::new(3.0, 4.0, 0.0));
        assert_eq!(
            output.status.correction_direction,
            Vector3::new(2.0, 3.0, 0.0)
        );
        assert!(output.fallback.is_none());
    }

    #[test]
    fn test_fallback_on_non_finite_command() {
        let mut controller = make_controller();
        controller.activate();
        controller.control_ne.ne_command = Vector2::new(f32::NAN, 0.0);

        let output = controller.update_autopilot(&test_input());

        // Нейтральная команда вместо рассчитанной
        assert_eq!(output.stabilization.roll, 0.0);
        assert_eq!(output.stabilization.pitch, 0.0);

        // Цель удержания строится из текущей позиции
        match output.fallback.expect("ожидался откат") {
            PathObjective::GotoEndpoint {
                start,
                end,
                starting_velocity,
                ending_velocity,
            } => {
                assert_eq!(start, Vector3::new(10.0, -5.0, -40.0));
                assert_eq!(end, start);
                assert_eq!(starting_velocity, 0.0);
                assert_eq!(ending_velocity, 0.0);
            }
            _ => panic!("ожидалась цель GotoEndpoint"),
        }
    }
}
