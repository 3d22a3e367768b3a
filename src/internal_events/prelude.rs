pub mod error_stage {
    pub const PROCESSING: &str = "processing";
}

pub mod error_type {
    pub const PARSER_FAILED: &str = "parser_failed";
    pub const CONDITION_FAILED: &str = "condition_failed";
}

/// Why a field was left out of the decoded message.
pub mod skip_reason {
    pub const UNSUPPORTED_FIELD: &str = "unsupported_field";
    pub const BASIC_LIST: &str = "basic_list";
    pub const MISSING_SUB_TEMPLATE: &str = "missing_sub_template";
    pub const SUB_TEMPLATE_MULTI_LIST: &str = "sub_template_multi_list";
}
