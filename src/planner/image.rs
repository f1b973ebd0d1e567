use log::debug;

use partplan_api::{
    config::ImageCatalog,
    plan::{FilesystemAssignment, ImageDeployment, ImageScheme},
};

/// Maps catalog images onto the devices of the filesystems they seed.
///
/// Filesystems whose mount point has no catalog entry are left alone.
#[tracing::instrument(skip_all)]
pub fn build_image_scheme(
    filesystems: &[FilesystemAssignment],
    catalog: &ImageCatalog,
) -> ImageScheme {
    let images = filesystems
        .iter()
        .filter_map(|fs| {
            let Some(source) = catalog.get(&fs.mount) else {
                debug!("No image for filesystem mounted at '{}'", fs.mount);
                return None;
            };
            debug!(
                "Seeding '{}' ({}) with {}",
                fs.device.display(),
                fs.mount,
                source.uri
            );
            Some(ImageDeployment {
                uri: source.uri.clone(),
                target_device: fs.device.clone(),
                format: source.format.clone(),
                container: source.container,
            })
        })
        .collect();

    ImageScheme { images }
}
