// Crate entry point. Re-export modules so tests and callers can import them easily.
//
// Responsibilities
// - Only declare and expose modules. No persistence logic here.
//
// How it is used
// - Callers open a `KeyValueEventStore` over a backend and talk to it through the `EventStore` port.
// - Tests import modules from this crate root to reach the code under test.

pub mod config;

pub mod core {
    pub mod context;
    pub mod errors;
    pub mod event;
    pub mod ids;
    pub mod keys;
    pub mod ports;
    pub mod record;
}

pub mod encoding {
    pub mod encoder;
    pub mod json_encoder;
    pub mod registry;
}

pub mod application {
    pub mod append;
    pub mod load;
    pub mod purge;
    pub mod store;
}

pub mod adapters {
    pub mod in_memory {
        pub mod glob;
        pub mod in_memory_backend;
    }
    #[cfg(feature = "redis")]
    pub mod redis {
        pub mod redis_backend;
    }
}
