//! The feature document: its entity graph (A), loader (A), and the
//! parameter extractor / dialect adapter (B).

pub mod load;
pub mod model;
pub mod params;

pub use load::{load, parse, LoadError};
pub use model::{
    Action, ActionType, Column, Feature, FeatureSummary, Form, FormButton, FormMessage, FormMode,
    Mapping, MappingOption, Query, Record, Table,
};
pub use params::Dialect;
