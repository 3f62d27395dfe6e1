//! SFTP batch files: layouts, filenames and the upload/approval exchange.

mod exchange;
mod layout;
mod naming;

pub use exchange::{ApprovalFile, ApprovalSweep, BatchExchange};
pub use layout::{
    parse_delimited, render_delimited, render_fixed_width, Column, FileFormat, FileLayout, FixedWidthLayout,
};
pub use naming::FilenamePattern;
