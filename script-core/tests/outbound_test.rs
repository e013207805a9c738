use proptest::prelude::*;
use script_core::fakes::FakeHost;
use script_core::{
    NetworkLabel, NetworkSnapshot, OutboundMode, OutboundSelector, PersistentStore,
    SelectorOutcome, SsidList,
};

fn selector() -> OutboundSelector {
    OutboundSelector::new(
        SsidList::new(vec!["Tech".to_string(), "MyWifi".to_string()]),
        "current_wifi_ssid",
        "en0",
    )
}

#[tokio::test]
async fn test_first_run_always_applies_a_mode() {
    let host = FakeHost::new().with_network(NetworkSnapshot::wifi("Cafe", "192.168.0.7", "en0"));

    let outcome = selector().on_network_changed(&host.context()).await;

    assert_eq!(
        outcome,
        SelectorOutcome::Changed {
            network: NetworkLabel::Wifi("Cafe".to_string()),
            mode: OutboundMode::Rule,
            applied: true,
        }
    );
    assert_eq!(host.store.write_count(), 1);
    assert_eq!(host.outbound.requested(), vec![OutboundMode::Rule]);

    let posted = host.notifier.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].title, "Outbound");
    assert_eq!(posted[0].subtitle, "Now used Rule Mode");
    assert_eq!(posted[0].body, "Wi-Fi: Cafe\nIP address: 192.168.0.7");
}

#[tokio::test]
async fn test_unchanged_ssid_does_nothing() {
    let host = FakeHost::new().with_network(NetworkSnapshot::wifi("Tech", "192.168.1.2", "en0"));
    let selector = selector();

    selector.on_network_changed(&host.context()).await;
    let writes_after_first = host.store.write_count();
    let modes_after_first = host.outbound.requested().len();

    let outcome = selector.on_network_changed(&host.context()).await;

    assert!(matches!(outcome, SelectorOutcome::Unchanged { .. }));
    assert_eq!(host.store.write_count(), writes_after_first);
    assert_eq!(host.outbound.requested().len(), modes_after_first);
    assert_eq!(host.notifier.posted().len(), 1);
}

#[tokio::test]
async fn test_trusted_network_goes_direct_and_back() {
    let host = FakeHost::new().with_network(NetworkSnapshot::wifi("Tech", "192.168.1.2", "en0"));
    let selector = selector();

    selector.on_network_changed(&host.context()).await;
    host.network.set(NetworkSnapshot::wifi("Airport", "10.1.1.9", "en0"));
    selector.on_network_changed(&host.context()).await;
    host.network.set(NetworkSnapshot::wifi("MyWifi", "192.168.3.4", "en0"));
    selector.on_network_changed(&host.context()).await;

    assert_eq!(
        host.outbound.requested(),
        vec![OutboundMode::Direct, OutboundMode::Rule, OutboundMode::Direct]
    );
    assert_eq!(
        host.store.read("current_wifi_ssid").unwrap(),
        Some("MyWifi".to_string())
    );
    assert_eq!(host.notifier.posted()[0].subtitle, "Now used Direct Mode");
}

#[tokio::test]
async fn test_cellular_forces_rule_mode() {
    let host = FakeHost::new().with_network(NetworkSnapshot::wifi("Tech", "192.168.1.2", "en0"));
    let selector = selector();
    selector.on_network_changed(&host.context()).await;

    host.network.set(NetworkSnapshot::cellular("10.64.0.3", "pdp_ip0"));
    let outcome = selector.on_network_changed(&host.context()).await;

    assert_eq!(
        outcome,
        SelectorOutcome::Changed {
            network: NetworkLabel::Cellular,
            mode: OutboundMode::Rule,
            applied: true,
        }
    );
    let posted = host.notifier.posted();
    assert_eq!(posted[1].body, "NetWork: CELLULAR\nIP address: 10.64.0.3");

    // Staying on cellular is not a change
    let again = selector.on_network_changed(&host.context()).await;
    assert!(matches!(again, SelectorOutcome::Unchanged { .. }));
}

#[tokio::test]
async fn test_hidden_wifi_then_cellular_is_a_change() {
    // Associated on the Wi-Fi interface but the host reports no SSID
    let hidden = NetworkSnapshot {
        ssid: None,
        primary_address: Some("192.168.3.4".to_string()),
        primary_interface: Some("en0".to_string()),
    };
    let host = FakeHost::new().with_network(hidden);
    let selector = OutboundSelector::new(SsidList::new(vec!["*".to_string()]), "current_wifi_ssid", "en0");

    let first = selector.on_network_changed(&host.context()).await;
    assert!(matches!(
        first,
        SelectorOutcome::Changed {
            mode: OutboundMode::Direct,
            ..
        }
    ));

    host.network.set(NetworkSnapshot::cellular("10.64.0.3", "pdp_ip0"));
    let second = selector.on_network_changed(&host.context()).await;
    assert_eq!(
        second,
        SelectorOutcome::Changed {
            network: NetworkLabel::Cellular,
            mode: OutboundMode::Rule,
            applied: true,
        }
    );
    assert_eq!(host.outbound.requested(), vec![OutboundMode::Direct, OutboundMode::Rule]);
}

#[tokio::test]
async fn test_store_written_before_mode_change_and_rejection_silences_notification() {
    let host = FakeHost::new().with_network(NetworkSnapshot::wifi("Tech", "192.168.1.2", "en0"));
    host.outbound.set_accept(false);

    let outcome = selector().on_network_changed(&host.context()).await;

    assert!(matches!(
        outcome,
        SelectorOutcome::Changed {
            applied: false,
            ..
        }
    ));
    assert_eq!(
        host.store.writes(),
        vec![("current_wifi_ssid".to_string(), "Tech".to_string())]
    );
    assert_eq!(host.outbound.requested().len(), 1);
    assert!(host.notifier.posted().is_empty());
}

proptest! {
    #[test]
    fn prop_membership_decides_mode(ssid in "[A-Za-z0-9]{1,12}", listed in any::<bool>()) {
        let list = if listed { vec![ssid.clone()] } else { vec![] };
        let selector = OutboundSelector::new(SsidList::new(list), "k", "en0");
        let network = selector.label(&NetworkSnapshot::wifi(&ssid, "1.2.3.4", "en0"));
        let expected = if listed { OutboundMode::Direct } else { OutboundMode::Rule };
        prop_assert_eq!(selector.select_mode(&network), expected);
    }
}
