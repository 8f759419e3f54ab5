#![allow(dead_code)]


pub use fixtures::*;
pub use test_postgres::TestPostgres;
pub use test_rabbitmq::TestRabbitMq;
