fn main() {
    // WiFi credentials are baked in at build time via `option_env!`.
    for var in [
        "DOORBELL_WIFI_SSID",
        "DOORBELL_WIFI_PASS",
        "DOORBELL_WIFI_SSID_2",
        "DOORBELL_WIFI_PASS_2",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
