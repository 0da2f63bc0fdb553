pub mod histogram_gallery_identifier;
