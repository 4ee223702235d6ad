//! File I/O for settlement descriptions.

pub mod settlement;

pub use settlement::{
    BuildingRecord, SettlementFile, SourceRecord, parse_settlement, read_settlement,
    write_settlement,
};
