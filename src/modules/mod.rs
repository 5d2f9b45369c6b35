pub mod books;

use std::sync::Arc;

use bookshelf_kernel::{settings::Settings, ModuleRegistry};
use bookshelf_media::ImageStore;

use books::{form::UploadPolicy, repository::BookRepository, service::BookService};

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
    repository: Arc<dyn BookRepository>,
    images: Arc<dyn ImageStore>,
) {
    let service = BookService::new(repository, images).with_max_page_size(settings.books.max_page_size);
    registry.register(books::create_module(
        Arc::new(service),
        UploadPolicy::from_settings(&settings.uploads),
    ));
}
