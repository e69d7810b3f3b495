//! Per-target facts substituted into the master template.
//!
//! Most facts vary along a single axis, so they live in two small tables
//! ([`RevisionFacts`] and [`ReleaseFacts`]). The handful of combinations that
//! need packages from backports are listed in [`BACKPORTS_RULES`] and applied
//! on top.

use serde::Serialize;

use crate::target::{Release, Revision, Target};

pub const DEFAULT_MIRROR: &str = "http://deb.debian.org/debian";

const WIRELESS_FIRMWARE: &str = "firmware-brcm80211";
const GENERIC_FIRMWARE: &str = "raspi-firmware";
const PINNED_FIRMWARE: &str = "raspi3-firmware";

const FIX_FIRMWARE_CMD: &str = "sed -i s/raspi-firmware/raspi3-firmware/ ${ROOT?}/etc/systemd/system/rpi-reconfigure-raspi-firmware.service";
const STRIP_CMA_CMD: &str = "sed -i 's/cma=64M //' /boot/firmware/cmdline.txt";

#[derive(Debug, Clone, Copy)]
struct RevisionFacts {
    arch: &'static str,
    linux_image: &'static str,
    dtb: &'static str,
    serial_console: &'static str,
    wireless_firmware: Option<&'static str>,
    extra_chroot_shell_cmds: &'static [&'static str],
}

fn revision_facts(revision: Revision) -> RevisionFacts {
    match revision {
        Revision::Pi1 => RevisionFacts {
            arch: "armel",
            linux_image: "linux-image-rpi",
            dtb: "/usr/lib/linux-image-*-rpi/bcm*rpi-*.dtb",
            serial_console: "ttyAMA0,115200",
            wireless_firmware: Some(WIRELESS_FIRMWARE),
            extra_chroot_shell_cmds: &[],
        },
        Revision::Pi2 => RevisionFacts {
            arch: "armhf",
            linux_image: "linux-image-armmp",
            dtb: "/usr/lib/linux-image-*-armmp/bcm*rpi*.dtb",
            serial_console: "ttyAMA0,115200",
            wireless_firmware: None,
            extra_chroot_shell_cmds: &[],
        },
        Revision::Pi3 => RevisionFacts {
            arch: "arm64",
            linux_image: "linux-image-arm64",
            dtb: "/usr/lib/linux-image-*-arm64/broadcom/bcm*rpi*.dtb",
            serial_console: "ttyS1,115200",
            wireless_firmware: Some(WIRELESS_FIRMWARE),
            extra_chroot_shell_cmds: &[],
        },
        Revision::Pi4 => RevisionFacts {
            arch: "arm64",
            linux_image: "linux-image-arm64",
            dtb: "/usr/lib/linux-image-*-arm64/broadcom/bcm*rpi*.dtb",
            serial_console: "ttyS1,115200",
            wireless_firmware: Some(WIRELESS_FIRMWARE),
            // Drop the cma= override from the stock cmdline.
            extra_chroot_shell_cmds: &[STRIP_CMA_CMD],
        },
    }
}

#[derive(Debug, Clone)]
struct ReleaseFacts {
    security_suite: String,
    raspi_firmware: &'static str,
    fix_firmware: bool,
    host_separator: &'static str,
    touch_machine_id: &'static str,
    systemd_timesyncd: &'static str,
}

fn release_facts(release: Release) -> ReleaseFacts {
    if release.is_oldest() {
        ReleaseFacts {
            security_suite: format!("{release}/updates"),
            raspi_firmware: PINNED_FIRMWARE,
            fix_firmware: true,
            // FIXME: buster hostnames have no separator while newer releases
            // use an underscore. Kept as-is until someone decides which wins.
            host_separator: "",
            touch_machine_id: "touch /etc/machine-id",
            // Buster still ships timesyncd inside the systemd package.
            systemd_timesyncd: "systemd",
        }
    } else {
        ReleaseFacts {
            security_suite: format!("{release}-security"),
            raspi_firmware: GENERIC_FIRMWARE,
            fix_firmware: false,
            host_separator: "_",
            touch_machine_id: "",
            systemd_timesyncd: "systemd-timesyncd",
        }
    }
}

/// Which packages a target pulls from `<release>-backports`.
#[derive(Debug, Clone, Copy)]
pub struct BackportsRule {
    pub revision: Revision,
    pub release: Release,
    pub reason: &'static str,
    pub linux_image: bool,
    pub raspi_firmware: bool,
    pub wireless_firmware: bool,
}

pub const BACKPORTS_RULES: &[BackportsRule] = &[
    BackportsRule {
        revision: Revision::Pi4,
        release: Release::Buster,
        reason: "# raspi 4 needs kernel and firmware newer than buster's",
        linux_image: true,
        raspi_firmware: true,
        wireless_firmware: true,
    },
    BackportsRule {
        revision: Revision::Pi3,
        release: Release::Buster,
        reason: "# raspi 3 needs firmware-brcm80211 newer than buster's for wifi",
        linux_image: false,
        raspi_firmware: false,
        wireless_firmware: true,
    },
];

fn backports_rule(target: Target) -> Option<&'static BackportsRule> {
    BACKPORTS_RULES
        .iter()
        .find(|r| r.revision == target.revision && r.release == target.release)
}

/// Everything the template needs for one target. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactBundle {
    pub target: Target,
    pub arch: String,
    pub linux_image: String,
    pub dtb: String,
    pub security_suite: String,
    pub systemd_timesyncd: String,
    pub raspi_firmware: String,
    /// Empty when the board has no wireless chip.
    pub wireless_firmware: String,
    pub serial_console: String,
    pub hostname: String,
    pub touch_machine_id: String,
    pub backports_reason: Option<String>,
    pub fix_firmware_cmds: Vec<String>,
    pub extra_root_shell_cmds: Vec<String>,
    pub extra_chroot_shell_cmds: Vec<String>,
    pub backports_stanza: Vec<String>,
}

impl FactBundle {
    pub fn resolve(target: Target) -> Self {
        Self::resolve_with_mirror(target, DEFAULT_MIRROR)
    }

    pub fn resolve_with_mirror(target: Target, mirror: &str) -> Self {
        let rev = revision_facts(target.revision);
        let rel = release_facts(target.release);
        let backports_suite = target.release.backports_suite();

        let mut linux_image = rev.linux_image.to_string();
        let mut raspi_firmware = rel.raspi_firmware.to_string();
        let mut wireless_firmware = rev.wireless_firmware.unwrap_or_default().to_string();
        let mut fix_firmware = rel.fix_firmware;
        let mut backports_reason = None;

        if let Some(rule) = backports_rule(target) {
            let from_backports = |pkg: &str| format!("{pkg}/{backports_suite}");
            if rule.linux_image {
                linux_image = from_backports(rev.linux_image);
            }
            if rule.raspi_firmware {
                // Backports carries the renamed package, so nothing to fix up.
                raspi_firmware = from_backports(GENERIC_FIRMWARE);
                fix_firmware = false;
            }
            if rule.wireless_firmware {
                wireless_firmware = from_backports(WIRELESS_FIRMWARE);
            }
            backports_reason = Some(rule.reason.to_string());
        }

        let fix_firmware_cmds = if fix_firmware {
            vec![FIX_FIRMWARE_CMD.to_string()]
        } else {
            Vec::new()
        };

        let backports_stanza =
            backports_stanza(backports_reason.as_deref(), &backports_suite, mirror);

        Self {
            target,
            arch: rev.arch.to_string(),
            linux_image,
            dtb: rev.dtb.to_string(),
            security_suite: rel.security_suite,
            systemd_timesyncd: rel.systemd_timesyncd.to_string(),
            raspi_firmware,
            wireless_firmware,
            serial_console: rev.serial_console.to_string(),
            hostname: format!("rpi{}{}", rel.host_separator, target.revision),
            touch_machine_id: rel.touch_machine_id.to_string(),
            backports_reason,
            fix_firmware_cmds,
            extra_root_shell_cmds: Vec::new(),
            extra_chroot_shell_cmds: rev
                .extra_chroot_shell_cmds
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            backports_stanza,
        }
    }

    pub fn backports_enabled(&self) -> bool {
        self.backports_reason.is_some()
    }
}

fn backports_stanza(reason: Option<&str>, suite: &str, mirror: &str) -> Vec<String> {
    let mirror = mirror.trim_end_matches('/');
    match reason {
        Some(reason) => vec![
            reason.to_string(),
            format!("deb {mirror}/ {suite} main contrib non-free"),
        ],
        None => vec![
            "# Backports are _not_ enabled by default.".to_string(),
            "# Enable them by uncommenting the following line:".to_string(),
            format!("# deb {mirror} {suite} main contrib non-free"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(rev: Revision, rel: Release) -> FactBundle {
        FactBundle::resolve(Target::new(rev, rel))
    }

    #[test]
    fn every_target_resolves_populated_facts() {
        for target in Target::all() {
            let f = FactBundle::resolve(target);
            for (name, v) in [
                ("arch", &f.arch),
                ("linux_image", &f.linux_image),
                ("dtb", &f.dtb),
                ("security_suite", &f.security_suite),
                ("systemd_timesyncd", &f.systemd_timesyncd),
                ("raspi_firmware", &f.raspi_firmware),
                ("serial_console", &f.serial_console),
                ("hostname", &f.hostname),
            ] {
                assert!(!v.is_empty(), "{target}: {name} is empty");
            }
            assert!(f.backports_stanza.len() >= 2, "{target}: short stanza");
        }
    }

    #[test]
    fn pi1_buster_needs_firmware_rename() {
        let f = facts(Revision::Pi1, Release::Buster);
        assert_eq!(f.arch, "armel");
        assert_eq!(f.linux_image, "linux-image-rpi");
        assert_eq!(f.raspi_firmware, "raspi3-firmware");
        assert_eq!(f.fix_firmware_cmds.len(), 1);
        assert!(f.fix_firmware_cmds[0].starts_with("sed -i s/raspi-firmware/raspi3-firmware/"));
        assert_eq!(f.hostname, "rpi1");
        assert_eq!(f.security_suite, "buster/updates");
        assert_eq!(f.touch_machine_id, "touch /etc/machine-id");
        assert_eq!(f.systemd_timesyncd, "systemd");
        assert!(!f.backports_enabled());
    }

    #[test]
    fn pi4_buster_pulls_from_backports() {
        let f = facts(Revision::Pi4, Release::Buster);
        assert_eq!(f.linux_image, "linux-image-arm64/buster-backports");
        assert_eq!(f.raspi_firmware, "raspi-firmware/buster-backports");
        assert_eq!(f.wireless_firmware, "firmware-brcm80211/buster-backports");
        assert!(f.fix_firmware_cmds.is_empty());
        assert_eq!(
            f.extra_chroot_shell_cmds,
            vec!["sed -i 's/cma=64M //' /boot/firmware/cmdline.txt".to_string()]
        );
        assert_eq!(
            f.backports_stanza,
            vec![
                "# raspi 4 needs kernel and firmware newer than buster's".to_string(),
                "deb http://deb.debian.org/debian/ buster-backports main contrib non-free"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn pi3_buster_only_backports_wireless() {
        let f = facts(Revision::Pi3, Release::Buster);
        assert_eq!(f.linux_image, "linux-image-arm64");
        assert_eq!(f.raspi_firmware, "raspi3-firmware");
        assert_eq!(f.wireless_firmware, "firmware-brcm80211/buster-backports");
        assert_eq!(f.fix_firmware_cmds.len(), 1);
        assert_eq!(
            f.backports_reason.as_deref(),
            Some("# raspi 3 needs firmware-brcm80211 newer than buster's for wifi")
        );
    }

    #[test]
    fn pi2_bookworm_has_no_wireless() {
        let f = facts(Revision::Pi2, Release::Bookworm);
        assert_eq!(f.arch, "armhf");
        assert_eq!(f.wireless_firmware, "");
        assert_eq!(f.hostname, "rpi_2");
        assert_eq!(f.systemd_timesyncd, "systemd-timesyncd");
        assert_eq!(f.security_suite, "bookworm-security");
        assert_eq!(f.touch_machine_id, "");
    }

    #[test]
    fn pi3_bullseye_has_backports_disabled() {
        let f = facts(Revision::Pi3, Release::Bullseye);
        assert!(!f.backports_enabled());
        assert_eq!(f.wireless_firmware, "firmware-brcm80211");
        assert_eq!(f.raspi_firmware, "raspi-firmware");
        assert!(f.fix_firmware_cmds.is_empty());
        assert_eq!(f.serial_console, "ttyS1,115200");
        assert_eq!(
            f.backports_stanza.last().map(String::as_str),
            Some("# deb http://deb.debian.org/debian bullseye-backports main contrib non-free")
        );
    }

    #[test]
    fn root_shell_cmds_are_always_empty() {
        assert!(Target::all().all(|t| FactBundle::resolve(t).extra_root_shell_cmds.is_empty()));
    }

    #[test]
    fn custom_mirror_lands_in_stanza() {
        let f = FactBundle::resolve_with_mirror(
            Target::new(Revision::Pi4, Release::Buster),
            "http://mirror.example/debian/",
        );
        assert_eq!(
            f.backports_stanza[1],
            "deb http://mirror.example/debian/ buster-backports main contrib non-free"
        );
    }
}
