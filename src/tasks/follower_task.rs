// src/tasks/follower_task.rs
use core::sync::atomic::Ordering;
use embassy_time::{Duration, Ticker};

use crate::control::ne_pid::NeControl;
use crate::control::velocity::VelocityRoamController;
use crate::data::{CHANNELS, FOLLOWER_STATE};

/// Циклический исполнитель режима скоростного руления
///
/// Один вызов цикла управления на период, без внутренних потоков и
/// блокирующего ввода-вывода. Настройки и цели доставляются каналами и
/// применяются между циклами в том же контексте исполнения, поэтому
/// дополнительной синхронизации не требуется. Запускается прошивкой на
/// любом исполнителе embassy.
pub async fn run<C: NeControl>(mut controller: VelocityRoamController<C>) -> ! {
    let mut period_ms = controller.settings().update_period_ms;
    let mut ticker = Ticker::every(Duration::from_millis(u64::from(period_ms)));

    loop {
        ticker.next().await;

        // Замена снимка настроек; при смене периода перезаводим таймер
        while let Ok(settings) = CHANNELS.settings_channel.try_receive() {
            controller.settings_updated(&settings);
            if settings.update_period_ms != period_ms {
                period_ms = settings.update_period_ms;
                ticker = Ticker::every(Duration::from_millis(u64::from(period_ms)));
                info!("Скоростное руление: период цикла {} мс", period_ms);
            }
        }

        // Включение/выключение режима внешним диспетчером
        if FOLLOWER_STATE.engaged.load(Ordering::Relaxed) {
            controller.activate();
        } else {
            controller.deactivate();
        }

        // Смена цели принимается только в активном режиме
        while let Ok(objective) = CHANNELS.objective_channel.try_receive() {
            if controller.is_active() {
                controller.objective_updated(&objective);
            }
        }

        if !controller.is_active() {
            continue;
        }

        // Свежий снимок измерений от оценщика состояния
        let input = match *FOLLOWER_STATE.last_input.lock().await {
            Some(input) => input,
            None => continue,
        };

        let output = controller.update_autopilot(&input);

        if output.fallback.is_some() {
            // Диспетчер обязан заменить активную цель на цель удержания
            debug!("Скоростное руление: опубликована цель удержания позиции");
        }

        *FOLLOWER_STATE.last_output.lock().await = Some(output);
    }
}
