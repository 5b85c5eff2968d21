pub mod types;
pub mod utils;
pub mod env;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn envelope_serializes_null_data() {
        let body = types::ApiResponse::<()>::failure("Account is inactive");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["message"], "Account is inactive");
    }
}
