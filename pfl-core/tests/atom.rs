use std::cmp::Ordering;

use pfl_core::atom::{compare_versions, Cpv};
use pfl_core::PflError;

#[test]
fn parses_category_name_and_version() {
    let cpv = Cpv::parse("dev-libs/foo-1.0").expect("valid atom");
    assert_eq!(cpv.category, "dev-libs");
    assert_eq!(cpv.name, "foo");
    assert_eq!(cpv.version, "1.0");
    assert_eq!(cpv.cp(), "dev-libs/foo");
    assert_eq!(cpv.pf(), "foo-1.0");
    assert_eq!(cpv.to_string(), "dev-libs/foo-1.0");
}

#[test]
fn keeps_revision_but_drops_r0() {
    assert_eq!(Cpv::parse("sys-apps/portage-3.0.63-r1").unwrap().version, "3.0.63-r1");
    assert_eq!(Cpv::parse("sys-apps/portage-3.0.63-r0").unwrap().version, "3.0.63");
}

#[test]
fn package_names_may_contain_dashes_and_digits() {
    let cpv = Cpv::parse("=media-libs/libsdl2-compat-2-2.30.0_rc1").unwrap();
    assert_eq!(cpv.name, "libsdl2-compat-2");
    assert_eq!(cpv.version, "2.30.0_rc1");
}

#[test]
fn rejects_strings_without_version() {
    assert!(matches!(
        Cpv::parse("dev-libs/foo"),
        Err(PflError::InvalidAtom(_))
    ));
    assert!(Cpv::parse("foo-1.0").is_err());
}

#[test]
fn orders_versions_like_the_package_manager() {
    assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
    assert_eq!(compare_versions("1.0_rc1", "1.0"), Ordering::Less);
    assert_eq!(compare_versions("1.0_p1", "1.0"), Ordering::Greater);
    assert_eq!(compare_versions("1.0_alpha", "1.0_beta2"), Ordering::Less);
    assert_eq!(compare_versions("1.0-r2", "1.0-r10"), Ordering::Less);
    assert_eq!(compare_versions("1.0a", "1.0"), Ordering::Greater);
    assert_eq!(compare_versions("2.0", "2.0"), Ordering::Equal);
    assert_eq!(compare_versions("1.01", "1.1"), Ordering::Less);
}
