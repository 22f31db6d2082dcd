pub mod account_service;
pub mod discount_service;
pub mod estimate_service;
pub mod membership_service;
pub mod resource_service;
pub mod sample_data;

pub use account_service::{AccountService, LoginRequest, LoginResult, RegisterRequest, RegisteredAccount};
pub use discount_service::{apply_promo_code, validate_promo, AppliedDiscount, ValidatePromoRequest};
pub use estimate_service::{EstimateQuery, EstimateService, JobEstimate};
pub use membership_service::{
    AcceptInvitationRequest, CurrentOrganization, Invitation, InviteRequest, MemberView, MembershipService,
    UpdateRoleRequest,
};
pub use resource_service::ResourceService;
pub use sample_data::{seed_sample_data, SampleDataSummary};
