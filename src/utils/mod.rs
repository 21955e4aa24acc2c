pub mod scenario;

pub use self::scenario::ScenarioBuilder;
