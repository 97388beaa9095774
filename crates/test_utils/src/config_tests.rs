use super::*;
use secrecy::ExposeSecret;
use serial_test::serial;

const REQUIRED: &[(&str, &str)] = &[
    ("AZURE_SUBSCRIPTION_ID", "00000000-0000-0000-0000-000000000001"),
    ("AZURE_TENANT_ID", "tenant"),
    ("AZURE_ACCOUNT_NAME", "azure@contoso.com"),
    ("AZURE_ACCOUNT_PASSWORD", "azure-password"),
    ("M365_ACCOUNT_NAME", "m365@contoso.com"),
    ("M365_ACCOUNT_PASSWORD", "m365-password"),
    ("M365_TENANT_ID", "m365-tenant"),
    ("M365_COLLABORATOR", "collaborator@contoso.com"),
    ("CLEAN_CLIENT_ID", "clean-client"),
];

fn set_required() {
    for (name, value) in REQUIRED {
        unsafe {
            env::set_var(name, value);
        }
    }
}

fn clear_all() {
    for (name, _) in REQUIRED {
        unsafe {
            env::remove_var(name);
        }
    }
    unsafe {
        env::remove_var("AZURE_ACCOUNT_OBJECT_ID");
    }
}

#[test]
#[serial]
fn test_from_env_reads_all_variables() {
    set_required();
    unsafe {
        env::set_var("AZURE_ACCOUNT_OBJECT_ID", "object-id");
    }

    let config = E2eConfig::from_env().unwrap();

    assert_eq!(config.subscription_id, "00000000-0000-0000-0000-000000000001");
    assert_eq!(config.m365_collaborator, "collaborator@contoso.com");
    assert_eq!(config.azure_account_password.expose_secret(), "azure-password");
    assert_eq!(config.account_object_id().unwrap(), "object-id");
    assert!(!format!("{config:?}").contains("m365-password"));

    clear_all();
}

#[test]
#[serial]
fn test_from_env_names_missing_variable() {
    set_required();
    unsafe {
        env::remove_var("M365_TENANT_ID");
    }

    let err = E2eConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("M365_TENANT_ID"));

    clear_all();
}

#[test]
#[serial]
fn test_account_object_id_is_optional_until_used() {
    set_required();
    unsafe {
        env::remove_var("AZURE_ACCOUNT_OBJECT_ID");
    }

    let config = E2eConfig::from_env().unwrap();
    let err = config.account_object_id().unwrap_err();
    assert!(err.to_string().contains("AZURE_ACCOUNT_OBJECT_ID"));

    clear_all();
}

#[test]
fn test_feature_flag_env() {
    let flags = feature_flag_env();
    assert_eq!(flags.get(BICEP_ENV_CHECKER_FLAG).map(String::as_str), Some("true"));
    assert_eq!(flags.get(INSIDER_PREVIEW_FLAG).map(String::as_str), Some("true"));
}

#[test]
#[serial]
fn test_insider_preview_disabled_only_by_literal_false() {
    unsafe {
        env::remove_var(INSIDER_PREVIEW_FLAG);
    }
    assert!(is_insider_preview_enabled());

    unsafe {
        env::set_var(INSIDER_PREVIEW_FLAG, "0");
    }
    assert!(is_insider_preview_enabled());

    unsafe {
        env::set_var(INSIDER_PREVIEW_FLAG, "false");
    }
    assert!(!is_insider_preview_enabled());

    unsafe {
        env::remove_var(INSIDER_PREVIEW_FLAG);
    }
}
