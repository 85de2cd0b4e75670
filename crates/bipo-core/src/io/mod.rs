pub mod ledger;
pub mod source;

pub use ledger::{LedgerRow, append_error, append_summary, load_processed};
pub use source::{
    EventSource, JsonColumnSource, JsonColumns, RecordColumns, batch_from_columns, event_columns,
    write_columns, write_json_columns,
};
