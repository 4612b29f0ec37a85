// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

macro_rules! error_codes {
    ($( $(#[$meta:meta])* $variant:ident => $wire:literal, )+) => {
        /// An error code returned by the API.
        ///
        /// Codes unknown to this version of the library are preserved in
        /// [`ErrorCode::Unknown`].
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        pub enum ErrorCode {
            $( $(#[$meta])* $variant, )+
            /// A code not known to this version of the library.
            Unknown(String),
        }

        impl ErrorCode {
            /// The wire representation of the code.
            pub fn as_str(&self) -> &str {
                match self {
                    $( ErrorCode::$variant => $wire, )+
                    ErrorCode::Unknown(code) => code.as_str(),
                }
            }
        }

        impl From<&str> for ErrorCode {
            fn from(code: &str) -> Self {
                match code {
                    $( $wire => ErrorCode::$variant, )+
                    "limit_reached" => ErrorCode::RateLimitExceeded,
                    other => ErrorCode::Unknown(other.to_string()),
                }
            }
        }
    };
}

error_codes! {
    /// Generic service error.
    ServiceError => "service_error",
    /// Rate limit exceeded.
    RateLimitExceeded => "rate_limit_exceeded",
    /// Unknown error.
    UnknownError => "unknown_error",
    /// Resource not found.
    NotFound => "not_found",
    /// Validation error.
    InvalidInput => "invalid_input",
    /// Insufficient permissions.
    Forbidden => "forbidden",
    /// Request was made with an invalid or unknown token.
    Unauthorized => "unauthorized",
    /// Invalid JSON in request.
    JsonError => "json_error",
    /// Item is locked, another action is running.
    Locked => "locked",
    /// Resource limit exceeded.
    ResourceLimitExceeded => "resource_limit_exceeded",
    /// Resource currently unavailable.
    ResourceUnavailable => "resource_unavailable",
    /// One or more fields must be unique.
    UniquenessError => "uniqueness_error",
    /// The action is protected.
    Protected => "protected",
    /// Cannot perform operation due to maintenance.
    Maintenance => "maintenance",
    /// The resource has changed during the request, please retry.
    Conflict => "conflict",
    /// Robot was not available.
    RobotUnavailable => "robot_unavailable",
    /// The resource is locked, contact support.
    ResourceLocked => "resource_locked",
    /// Error within the API backend.
    ServerError => "server_error",
    /// The token is only allowed to perform GET requests.
    TokenReadonly => "token_readonly",
    /// The request could not be answered in time, please retry.
    Timeout => "timeout",
    /// The given resource does not support this.
    UnsupportedError => "unsupported_error",
    /// The API functionality was removed.
    DeprecatedApiEndpoint => "deprecated_api_endpoint",

    // Servers
    InvalidServerType => "invalid_server_type",
    ServerNotStopped => "server_not_stopped",
    NetworksOverlap => "networks_overlap",
    PlacementError => "placement_error",
    ServerAlreadyAttached => "server_already_attached",
    PrimaryIpAssigned => "primary_ip_assigned",
    PrimaryIpDatacenterMismatch => "primary_ip_datacenter_mismatch",
    PrimaryIpVersionMismatch => "primary_ip_version_mismatch",
    ServerHasIpv4 => "server_has_ipv4",
    ServerHasIpv6 => "server_has_ipv6",
    PrimaryIpAlreadyAssigned => "primary_ip_already_assigned",
    ServerIsLoadBalancerTarget => "server_is_load_balancer_target",

    // Load Balancers
    IpNotOwned => "ip_not_owned",
    SourcePortAlreadyUsed => "source_port_already_used",
    CloudResourceIpNotAllowed => "cloud_resource_ip_not_allowed",
    ServerNotAttachedToNetwork => "server_not_attached_to_network",
    TargetAlreadyDefined => "target_already_defined",
    InvalidLoadBalancerType => "invalid_load_balancer_type",
    LoadBalancerAlreadyAttached => "load_balancer_already_attached",
    TargetsWithoutUsePrivateIp => "targets_without_use_private_ip",
    LoadBalancerNotAttachedToNetwork => "load_balancer_not_attached_to_network",
    MissingIpv4 => "missing_ipv4",

    // Networks
    IpNotAvailable => "ip_not_available",
    NoSubnetAvailable => "no_subnet_available",
    VSwitchAlreadyUsed => "vswitch_id_already_used",

    // Volumes
    NoSpaceLeftInLocation => "no_space_left_in_location",
    VolumeAlreadyAttached => "volume_already_attached",

    // Firewalls
    FirewallAlreadyApplied => "firewall_already_applied",
    IncompatibleNetworkType => "incompatible_network_type",
    ResourceInUse => "resource_in_use",
    ServerAlreadyAdded => "server_already_added",
    FirewallResourceNotFound => "firewall_resource_not_found",
    FirewallManagedByLabelSelector => "firewall_managed_by_label_selector",
    PrivateNetOnlyServer => "private_net_only_server",
    FirewallAlreadyRemoved => "firewall_already_removed",

    // Certificates and DNS
    CaaRecordDoesNotAllowCa => "caa_record_does_not_allow_ca",
    CaDnsValidationFailed => "ca_dns_validation_failed",
    CaTooManyAuthorizationsFailedRecently => "ca_too_many_authorizations_failed_recently",
    CaTooManyCertificatesIssuedForRegisteredDomain => "ca_too_many_certificates_issued_for_registered_domain",
    CaTooManyDuplicateCertificates => "ca_too_many_duplicate_certificates",
    CouldNotVerifyDomainDelegatedToZone => "could_not_verify_domain_delegated_to_zone",
    DnsZoneNotFound => "dns_zone_not_found",
    DnsZoneIsSecondaryZone => "dns_zone_is_secondary_zone",
}

impl ErrorCode {
    /// Legacy name of [`ErrorCode::RateLimitExceeded`], kept so code written
    /// against the old `limit_reached` code keeps matching rate limit errors.
    pub const LIMIT_REACHED: ErrorCode = ErrorCode::RateLimitExceeded;
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(ErrorCode::from(code.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_reached_alias() {
        assert_eq!(ErrorCode::LIMIT_REACHED, ErrorCode::RateLimitExceeded);
        assert_eq!(ErrorCode::from("limit_reached"), ErrorCode::RateLimitExceeded);
        assert_eq!(ErrorCode::LIMIT_REACHED.as_str(), "rate_limit_exceeded");
    }

    #[test]
    fn test_known_codes_round_trip_through_wire_string() {
        for code in [
            ErrorCode::Conflict,
            ErrorCode::InvalidInput,
            ErrorCode::VSwitchAlreadyUsed,
            ErrorCode::DeprecatedApiEndpoint,
        ] {
            assert_eq!(ErrorCode::from(code.as_str()), code);
        }
    }

    #[test]
    fn test_unknown_code_is_preserved() {
        let code = ErrorCode::from("brand_new_error");
        assert_eq!(code, ErrorCode::Unknown("brand_new_error".to_string()));
        assert_eq!(code.to_string(), "brand_new_error");
    }

    #[test]
    fn test_serde() {
        let code: ErrorCode = serde_json::from_str("\"volume_already_attached\"").unwrap();
        assert_eq!(code, ErrorCode::VolumeAlreadyAttached);
        assert_eq!(
            serde_json::to_string(&ErrorCode::NotFound).unwrap(),
            "\"not_found\""
        );
    }
}
