use super::*;
use serial_test::serial;

#[test]
#[serial]
fn state_dir_prefers_xdg_state_home() {
    let tmp = std::env::temp_dir().join("sluice-xdg-state");
    unsafe { env::set_var("XDG_STATE_HOME", &tmp) };

    assert_eq!(state_dir(), tmp.join(PROGRAM_NAME));
    assert_eq!(
        default_spool_path(),
        tmp.join(PROGRAM_NAME).join(SPOOL_FILE_NAME)
    );

    unsafe { env::remove_var("XDG_STATE_HOME") };
}

#[test]
#[serial]
fn state_dir_ignores_empty_xdg_state_home() {
    unsafe { env::set_var("XDG_STATE_HOME", "") };

    let dir = state_dir();
    assert!(
        dir.ends_with(PROGRAM_NAME),
        "state dir {:?} should end with the program name",
        dir
    );
    assert_ne!(dir, PathBuf::from(PROGRAM_NAME));

    unsafe { env::remove_var("XDG_STATE_HOME") };
}

#[test]
#[serial]
fn xdg_or_home_falls_back_to_home_suffix() {
    let home = std::env::var_os("HOME");
    unsafe {
        env::remove_var("SLUICE_TEST_XDG");
        env::set_var("HOME", "/home/sluice");
    }

    assert_eq!(
        xdg_or_home("SLUICE_TEST_XDG", ".cache"),
        PathBuf::from("/home/sluice/.cache")
    );

    unsafe { env::set_var("SLUICE_TEST_XDG", "/var/cache") };
    assert_eq!(
        xdg_or_home("SLUICE_TEST_XDG", ".cache"),
        PathBuf::from("/var/cache")
    );

    unsafe {
        env::remove_var("SLUICE_TEST_XDG");
        match home {
            Some(h) => env::set_var("HOME", h),
            None => env::remove_var("HOME"),
        }
    }
}
