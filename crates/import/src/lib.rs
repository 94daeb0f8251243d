pub mod layout;
pub mod statement;

pub use layout::{
    AmountColumns, CanonicalField, FieldMap, LayoutError, LayoutRegistry, SignConvention,
    SourceLayout,
};
pub use statement::{parse, parse_with_layout, ParseError, ParseReport, RowError, RowErrorKind};
