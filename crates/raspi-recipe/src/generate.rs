//! Template in, recipe out.

use std::path::{Path, PathBuf};

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::facts::FactBundle;
use crate::target::Target;
use crate::{render, sanitize, util};

#[derive(Debug, Clone)]
pub struct Recipe {
    pub facts: FactBundle,
    pub text: String,
}

impl Recipe {
    pub fn file_name(&self) -> String {
        self.facts.target.recipe_file_name()
    }
}

/// Render and sanitize `template` for `facts`. Pure apart from logging.
pub fn render_recipe(template: &str, facts: &FactBundle) -> String {
    let rendered = render::render(template, facts);
    let leftovers = render::leftover_tokens(&rendered);
    if !leftovers.is_empty() {
        tracing::warn!(
            recipe = %facts.target,
            tokens = %leftovers.join(", "),
            "template contains placeholders this generator does not know"
        );
    }
    sanitize::sanitize(&rendered)
}

/// Resolve facts for `target` and render the configured template.
pub fn generate(target: Target, cfg: &GeneratorConfig) -> Result<Recipe> {
    let facts = FactBundle::resolve_with_mirror(target, cfg.mirror());
    let template_path = cfg.template_path();
    tracing::info!(recipe = %target, template = %template_path.display(), "rendering recipe");
    let template = util::read_text(&template_path)?;
    let text = render_recipe(&template, &facts);
    Ok(Recipe { facts, text })
}

/// Write the recipe under `output_dir`, overwriting any previous one.
pub fn write_recipe(recipe: &Recipe, output_dir: &Path) -> Result<PathBuf> {
    let out = output_dir.join(recipe.file_name());
    util::write_text(&out, &recipe.text)?;
    tracing::info!(path = %out.display(), bytes = recipe.text.len(), "wrote recipe");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Release, Revision};

    const TEMPLATE: &str = "\
steps:
  - apt: install
    packages:
    - __LINUX_IMAGE__
    - __WIRELESS_FIRMWARE__
  - chroot: tag
    shell: |
      __FIX_FIRMWARE_PKG_NAME__
      __EXTRA_CHROOT_SHELL_CMDS__
";

    #[test]
    fn empty_expansions_leave_no_trace() {
        let facts = FactBundle::resolve(Target::new(Revision::Pi2, Release::Bookworm));
        let got = render_recipe(TEMPLATE, &facts);
        assert_eq!(
            got,
            "steps:\n  - apt: install\n    packages:\n    - linux-image-armmp\n  - chroot: tag\n    shell: |\n"
        );
    }

    #[test]
    fn buster_pi1_gets_rename_fix() {
        let facts = FactBundle::resolve(Target::new(Revision::Pi1, Release::Buster));
        let got = render_recipe(TEMPLATE, &facts);
        assert!(got.contains(
            "      sed -i s/raspi-firmware/raspi3-firmware/ ${ROOT?}/etc/systemd/system/rpi-reconfigure-raspi-firmware.service\n"
        ));
        assert!(got.contains("    - firmware-brcm80211\n"));
    }
}
