/*
* Copyright (C) 2019-2023 EverX. All Rights Reserved.
*
* Licensed under the SOFTWARE EVALUATION License (the "License"); you may not use
* this file except in compliance with the License.
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific EVERX DEV software governing permissions and
* limitations under the License.
*/

use super::*;
use std::io::Write;

#[test]
fn test_defaults() {
    let config = LocatorConfig::from_json("{}").unwrap();
    assert_eq!(config, LocatorConfig::default());
    assert_eq!(config.endpoint, "https://testnet.toncenter.com/api/v2/");
    assert_eq!(config.limit, 10);
    assert_eq!(config.initial_delay(), Duration::from_secs(10));
    assert_eq!(config.poll_delay(), Duration::from_secs(5));
    assert_eq!(config.max_polls, 10);
    assert_eq!(config.retry_policy(), RetryPolicy::new(3, Duration::from_secs(3)));
}

#[test]
fn test_partial_override() {
    let config: LocatorConfig = r#"{
        "endpoint": "https://toncenter.com/api/v2",
        "api_key": "secret",
        "retry_attempts": 5,
        "retry_delay_ms": 250
    }"#.parse().unwrap();
    assert_eq!(config.api_key.as_deref(), Some("secret"));
    assert_eq!(config.retry_policy(), RetryPolicy::new(5, Duration::from_millis(250)));
    assert_eq!(config.limit, 10);

    let locator = config.build_locator().unwrap();
    assert_eq!(locator.limit(), 10);
    assert_eq!(locator.initial_delay(), Duration::from_secs(10));
    assert_eq!(locator.retry_policy().max_attempts, 5);
    assert_eq!(locator.client().endpoint().as_str(), "https://toncenter.com/api/v2/");
}

#[test]
fn test_invalid_config() {
    assert!(LocatorConfig::from_json("{\"limit\": \"ten\"}").is_err());
    assert!(LocatorConfig::from_json("{\"limit\": 0}").is_err());
    assert!(LocatorConfig::from_json("{\"endpoint\": \" \"}").is_err());
    assert!(LocatorConfig::from_json("[").is_err());

    let config = LocatorConfig { endpoint: "::".to_string(), ..Default::default() };
    assert!(config.build_locator().is_err());
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"limit\": 20, \"max_polls\": 3, \"initial_delay_ms\": 0}}").unwrap();
    let config = LocatorConfig::from_file(file.path()).unwrap();
    assert_eq!(config.limit, 20);
    assert_eq!(config.max_polls, 3);
    assert!(config.initial_delay().is_zero());

    let err = LocatorConfig::from_file(file.path().with_extension("missing")).unwrap_err();
    assert!(err.to_string().starts_with("failed to read"), "{}", err);
}

#[test]
fn test_serialize_roundtrip() {
    let config = LocatorConfig { api_key: Some("key".into()), poll_delay_ms: 1, ..Default::default() };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(LocatorConfig::from_json(&json).unwrap(), config);
}
