//! End-to-end behaviour of search and synthesis through the data manager.

use vantage::{
    assign_levels, only_related, parse, ContactViewer, DataManager, GroupKind, ItemRef, Mirror,
    Monitored, Predicate, Settings, Viewer,
};
use vantage_types::{HostState, ServiceState};

fn infrastructure() -> Mirror {
    Mirror::builder()
        .generation(1)
        .host("router", |h| {
            h.state(HostState::Up)
                .hard()
                .business_impact(5)
                .contact("netops")
        })
        .host("web01", |h| {
            h.state(HostState::Down)
                .hard()
                .business_impact(3)
                .contact("webops")
                .tag("linux")
        })
        .host("web02", |h| {
            h.state(HostState::Down)
                .soft()
                .acknowledged()
                .contact("webops")
                .tag("linux")
        })
        .host("backup", |h| h.state(HostState::Unreachable).hard().in_downtime())
        .service("web01", "http", |s| s.state(ServiceState::Critical).hard().business_impact(4))
        .service("web02", "http", |s| s.state(ServiceState::Warning).soft().flapping())
        .service("router", "bgp", |s| s.state(ServiceState::Ok).hard())
        .contact("netops", |c| c.tag("network"))
        .contact("webops", |c| c)
        .contact("root", |c| c.admin())
        .contactgroup("web-team", |g| g.member("webops"))
        .build()
}

fn manager() -> DataManager {
    DataManager::new(infrastructure(), Settings::default())
}

fn names(items: &[ItemRef<'_>]) -> Vec<String> {
    items.iter().map(|i| i.full_name().into_owned()).collect()
}

#[test]
fn empty_search_is_the_visible_universe() {
    let dm = manager();
    let mirror = dm.mirror();
    let universe = || {
        mirror
            .hosts()
            .iter()
            .map(ItemRef::Host)
            .chain(mirror.services().iter().map(ItemRef::Service))
    };

    for user in [None, Some("netops"), Some("webops"), Some("root")] {
        let viewer = user.and_then(|name| ContactViewer::find(name, mirror));
        let viewer = viewer.as_ref().map(|v| v as &dyn Viewer);
        assert_eq!(dm.search("", viewer), only_related(universe(), viewer), "user {:?}", user);
    }
}

#[test]
fn business_impact_narrows_type_search() {
    let dm = manager();
    let hosts = dm.search("type:host", None);

    for n in 0..=6 {
        let important = dm.search(&format!("type:host bi:>={}", n), None);
        assert!(important.iter().all(|item| hosts.contains(item)));
        assert!(important
            .iter()
            .all(|item| item.as_monitored().is_some_and(|m| m.business_impact() >= n)));
    }
}

#[test]
fn isnot_complements_is() {
    let dm = manager();
    dm.synthesis(None, None);
    let everything = dm.search("", None);

    for flag in ["ack", "downtime", "impact", "flapping", "soft", "hard"] {
        let is = dm.search(&format!("is:{}", flag), None);
        let isnot = dm.search(&format!("isnot:{}", flag), None);

        assert_eq!(is.len() + isnot.len(), everything.len(), "flag {}", flag);
        assert!(is.iter().all(|item| !isnot.contains(item)), "flag {}", flag);
    }
}

#[test]
fn empty_synthesis_is_all_zero() {
    let dm = manager();
    let synthesis = dm.hosts_synthesis(Some(&[][..]), None);

    assert_eq!(synthesis.nb_elts, 0);
    assert_eq!(synthesis.bi, 0);
    assert!(synthesis.states.iter().all(|t| t.nb == 0 && t.pct == 0.0));
    assert_eq!(synthesis.nb_problems, 0);
    assert_eq!(synthesis.pct_downtime, 0.0);
}

#[test]
fn state_counts_never_exceed_total() {
    let dm = manager();
    let hosts = dm.hosts_synthesis(None, None);
    let services = dm.services_synthesis(None, None);

    let host_total: usize = hosts.states.iter().map(|t| t.nb).sum();
    let service_total: usize = services.states.iter().map(|t| t.nb).sum();
    assert!(host_total <= hosts.nb_elts);
    assert!(service_total <= services.nb_elts);
    // web02 is acknowledged and backup in downtime
    assert!(host_total < hosts.nb_elts);
}

#[test]
fn parse_keeps_quoted_values_in_order() {
    assert_eq!(
        parse(r#"host:"a b" type:host"#),
        vec![Predicate::new("host", "a b"), Predicate::new("type", "host")]
    );
}

#[test]
fn three_host_synthesis() {
    let mirror = Mirror::builder()
        .host("h1", |h| h.state(HostState::Up))
        .host("h2", |h| h.state(HostState::Down).hard())
        .host("h3", |h| h.state(HostState::Down).hard().acknowledged())
        .build();
    let dm = DataManager::new(mirror, Settings::default());

    let synthesis = dm.hosts_synthesis(None, None);
    assert_eq!(synthesis.nb_elts, 3);
    assert_eq!(synthesis.nb("up"), 1);
    assert_eq!(synthesis.nb("down"), 1);
    assert_eq!(synthesis.nb_ack, 1);
    assert_eq!(synthesis.nb_problems, 1);
    assert_eq!(synthesis.pct_problems, 33.3);
}

#[test]
fn group_hierarchy_levels() {
    let mirror = Mirror::builder()
        .hostgroup("A", |g| g.child("B"))
        .hostgroup("B", |g| g.child("C"))
        .hostgroup("C", |g| g)
        .servicegroup("X", |g| g.child("Y"))
        .servicegroup("Y", |g| g.child("X"))
        .build();

    let levels = assign_levels(&mirror, GroupKind::Host, None);
    assert_eq!((levels["A"], levels["B"], levels["C"]), (0, 1, 2));

    let cyclic = assign_levels(&mirror, GroupKind::Service, None);
    assert_eq!(cyclic.len(), 2);
}

#[test]
fn non_numeric_business_impact_matches_nothing() {
    let dm = manager();
    assert!(dm.search("bi:>=abc", None).is_empty());
    assert!(dm.search("type:host bi:abc", None).is_empty());
}

#[test]
fn contact_group_and_tag_predicates() {
    let dm = manager();
    assert_eq!(
        names(&dm.search("cg:web-team", None)),
        vec!["web01", "web02", "web01/http", "web02/http"]
    );
    assert_eq!(names(&dm.search("ctag:network", None)), vec!["router", "router/bgp"]);
    assert!(dm.search("cg:nobody", None).is_empty());
}

#[test]
fn synthesis_mode_changes_problem_counts() {
    let mirror = Mirror::builder()
        .host("h1", |h| h.state(HostState::Down).soft().problem())
        .build();

    let recompute = DataManager::new(mirror.clone(), Settings::default());
    assert_eq!(recompute.hosts_synthesis(None, None).nb_problems, 0);

    let settings = Settings {
        disable_inner_problems_computation: true,
        ..Settings::default()
    };
    let trusting = DataManager::new(mirror, settings);
    assert_eq!(trusting.hosts_synthesis(None, None).nb_problems, 1);
}

#[test]
fn group_searches_on_a_dumped_mirror() {
    use std::io::Write;
    use vantage::{FileSource, MirrorSource};

    let mut dump = tempfile::NamedTempFile::new().unwrap();
    write!(
        dump,
        r#"{{
            "hosts": [{{ "name": "web01" }}, {{ "name": "db01" }}],
            "services": [{{ "host_name": "web01", "description": "http" }}],
            "hostgroups": [{{ "name": "web", "members": ["web01"] }}],
            "servicegroups": [{{ "name": "front", "members": ["web01/http"] }}]
        }}"#
    )
    .unwrap();

    let mirror = FileSource::new(dump.path()).poll().unwrap();
    let dm = DataManager::new(mirror, Settings::default());
    assert_eq!(names(&dm.search("hg:web", None)), vec!["web01", "web01/http"]);
    assert_eq!(names(&dm.search("sg:front", None)), vec!["web01/http"]);
}
