#![cfg_attr(not(test), no_std)]

//! Подсистема следования по траектории для VTOL
//!
//! Библиотека реализует режим скоростного руления (velocity roam):
//! преобразование заданного горизонтального вектора скорости в команды
//! ориентации (крен/тангаж/рыскание) для мультикоптера или VTOL.
//!
//! Внутренний ПИД-контроллер North/East, оценщик состояния и аппаратная
//! привязка (исполнитель, драйверы) принадлежат прошивке и подключаются
//! через интерфейсы из [`control`] и [`data`].

// Этот модуль должен идти первым, чтобы его макросы были видны остальным.
pub(crate) mod fmt;

pub mod config;
pub mod control;
pub mod data;
pub mod tasks;
pub mod utils;
