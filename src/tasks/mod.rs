//! Задачи подсистемы следования по траектории

pub mod follower_task;
