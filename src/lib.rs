// Module naming follows project convention (AM = Active Message)
#[allow(non_snake_case)]
pub mod AM {
    pub mod Handler {
        pub mod Registry;
        pub mod Stats;
        pub use Registry::{HandlerEntry, HandlerId, HandlerRegistration, HandlerRegistry, RegistryBuilder};
        pub use Stats::{HandlerStats, StatsSnapshot};
    }
    pub mod Structs {
        pub mod Message;
        pub use Message::{
            CompletionFn, DispatchMode, HandlerContext, IncomingBuffer, MessageBuffer, MessageList,
            NodeId,
        }; // the struct stays at Message::Message; the module holds the name
    }
    pub mod Queue {
        pub mod Queue;
        pub mod Queue_impl;
        pub mod drain;
        pub mod todo;
        pub use Queue::{IncomingMessageManager, QueueCounters, QueueSnapshot};
        pub use todo::TodoList;
    }
    pub mod Backend {
        pub mod background;
        pub mod dedicated;
        pub use background::{ActivationHook, BackgroundWork, BackgroundWorkManager, BgWorkConfig, WorkItemHandle};
    }
    mod builder;
    mod debug;
    pub use builder::ManagerBuilder;
}
#[allow(non_snake_case)]
pub mod Core {
    pub mod clock;
    pub mod config;
    pub mod threads;
    pub mod time_limit;
    pub use config::DispatchConfig;
    pub use threads::CoreReservation;
    pub use time_limit::TimeLimit;
}
#[allow(non_snake_case)]
mod Debug {
    pub mod StructDebug;
}
pub mod error;

pub use error::DispatchError;
