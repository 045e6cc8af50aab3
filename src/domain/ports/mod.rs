pub mod assignment_repository;
pub mod attendant_repository;
pub mod company_repository;
pub mod distributed_lock;
pub mod event_bus;
pub mod task_spawner;
pub mod time_service;
