pub mod dummy_bus;
