//! Конфигурация подсистемы следования по траектории

pub mod flight;
