use metrics::counter;
use tracing::{debug, error, trace, warn};

use super::{InternalEvent, error_stage, error_type, skip_reason};
use crate::error::Error;

#[derive(Debug)]
pub struct IpfixMessageDecoded {
    pub observation_domain_id: u32,
    pub sequence_number: u32,
    pub template_count: usize,
    pub options_template_count: usize,
    pub flow_count: usize,
}

impl InternalEvent for IpfixMessageDecoded {
    fn emit(self) {
        trace!(
            message = "IPFIX message decoded.",
            observation_domain_id = self.observation_domain_id,
            sequence_number = self.sequence_number,
            template_count = self.template_count,
            options_template_count = self.options_template_count,
            flow_count = self.flow_count,
        );
        counter!("ipfix_messages_decoded_total").increment(1);
        counter!("ipfix_flows_decoded_total").increment(self.flow_count as u64);
    }

    fn name(&self) -> Option<&'static str> {
        Some("IpfixMessageDecoded")
    }
}

#[derive(Debug)]
pub struct IpfixParseError<'a> {
    pub error: &'a Error,
}

impl InternalEvent for IpfixParseError<'_> {
    fn emit(self) {
        let error_code = self.error.kind().as_str();
        error!(
            message = "Failed to decode IPFIX message.",
            error = %self.error,
            error_code = error_code,
            error_type = error_type::PARSER_FAILED,
            stage = error_stage::PROCESSING,
            internal_log_rate_limit = true,
        );
        counter!(
            "component_errors_total",
            "error_code" => error_code,
            "error_type" => error_type::PARSER_FAILED,
            "stage" => error_stage::PROCESSING,
        )
        .increment(1);
    }

    fn name(&self) -> Option<&'static str> {
        Some("IpfixParseError")
    }
}

/// A field whose element id has no definition within an otherwise known enterprise.
#[derive(Debug)]
pub struct IpfixUnsupportedField {
    pub element_id: u16,
    pub enterprise_number: u32,
    pub length: u16,
}

impl InternalEvent for IpfixUnsupportedField {
    fn emit(self) {
        warn!(
            message = "Skipping IPFIX field without information element definition.",
            element_id = self.element_id,
            enterprise_number = self.enterprise_number,
            length = self.length,
            error_type = error_type::CONDITION_FAILED,
            stage = error_stage::PROCESSING,
            internal_log_rate_limit = true,
        );
        counter!(
            "ipfix_fields_skipped_total",
            "reason" => skip_reason::UNSUPPORTED_FIELD,
        )
        .increment(1);
    }

    fn name(&self) -> Option<&'static str> {
        Some("IpfixUnsupportedField")
    }
}

#[derive(Debug)]
pub struct IpfixBasicListSkipped<'a> {
    pub field_name: &'a str,
    pub element_id: u16,
    pub enterprise_number: u32,
}

impl InternalEvent for IpfixBasicListSkipped<'_> {
    fn emit(self) {
        debug!(
            message = "Skipping basicList field, list contents are not decoded.",
            field = self.field_name,
            element_id = self.element_id,
            enterprise_number = self.enterprise_number,
            internal_log_rate_limit = true,
        );
        counter!("ipfix_fields_skipped_total", "reason" => skip_reason::BASIC_LIST).increment(1);
    }

    fn name(&self) -> Option<&'static str> {
        Some("IpfixBasicListSkipped")
    }
}

#[derive(Debug)]
pub struct IpfixSubTemplateListMissingTemplate<'a> {
    pub field_name: &'a str,
    pub template_id: u16,
}

impl InternalEvent for IpfixSubTemplateListMissingTemplate<'_> {
    fn emit(self) {
        warn!(
            message = "Skipping subTemplateList field, its template is not part of the message.",
            field = self.field_name,
            template_id = self.template_id,
            error_type = error_type::CONDITION_FAILED,
            stage = error_stage::PROCESSING,
            internal_log_rate_limit = true,
        );
        counter!(
            "ipfix_fields_skipped_total",
            "reason" => skip_reason::MISSING_SUB_TEMPLATE,
        )
        .increment(1);
    }

    fn name(&self) -> Option<&'static str> {
        Some("IpfixSubTemplateListMissingTemplate")
    }
}

#[derive(Debug)]
pub struct IpfixSubTemplateMultiListSkipped<'a> {
    pub field_name: &'a str,
    pub length: u16,
}

impl InternalEvent for IpfixSubTemplateMultiListSkipped<'_> {
    fn emit(self) {
        debug!(
            message = "Skipping subTemplateMultiList field.",
            field = self.field_name,
            length = self.length,
            internal_log_rate_limit = true,
        );
        counter!(
            "ipfix_fields_skipped_total",
            "reason" => skip_reason::SUB_TEMPLATE_MULTI_LIST,
        )
        .increment(1);
    }

    fn name(&self) -> Option<&'static str> {
        Some("IpfixSubTemplateMultiListSkipped")
    }
}

#[derive(Debug)]
pub struct IpfixSetPaddingSkipped {
    pub padding: usize,
}

impl InternalEvent for IpfixSetPaddingSkipped {
    fn emit(self) {
        trace!(
            message = "Skipping set padding.",
            padding = self.padding,
        );
    }

    fn name(&self) -> Option<&'static str> {
        Some("IpfixSetPaddingSkipped")
    }
}
