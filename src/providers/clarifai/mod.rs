pub mod clarifai;
