pub mod box_annotator;
pub mod ffmpeg_video_reader;
pub mod image_directory_reader;
pub mod image_file_writer;
