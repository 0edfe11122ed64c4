pub mod company_dto;

pub use company_dto::{
    CompanyQueryParams, CompanyResponseDto, CreateCompanyDto, ReportTemplateSummaryDto,
    UpdateCompanyDto,
};
