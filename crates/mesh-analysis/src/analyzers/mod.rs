mod injection;

pub use injection::InjectionAnalyzer;
