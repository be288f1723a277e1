//! Parser module tests.

mod classify_test;

/// Verify all public parser types are exported from the library.
#[test]
fn all_parser_types_exported() {
    use search_supervisor::config::MarkerConfig;
    use search_supervisor::parser::{
        CometParser, ConverterParser, GenericParser, MultiTaskParser, OutputParser, RawFileParser,
        Segmentation, Segmenter, ToolKind,
    };

    // Verify parser types are constructible
    let _ = GenericParser::new();
    let _ = CometParser::new();
    let _ = ConverterParser::new();
    let _ = RawFileParser::new();
    let _ = MultiTaskParser::new(MarkerConfig::default());
    let _ = Segmenter::new(Segmentation::Lines);

    // Verify the strategy table builds trait objects
    let markers = MarkerConfig::default();
    let _: Box<dyn OutputParser> = ToolKind::Generic.parser(&markers);
    let _: Box<dyn OutputParser> = ToolKind::MultiTask.parser(&markers);
}
